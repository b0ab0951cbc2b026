//! Aggregation of everything that can go wrong during a simulation run

use core::fmt::Display;

use mitosim_concepts::{CalcError, ConsistencyError, IndexError, SetupError, TimeError};

macro_rules! impl_error_variant {
    ($name: ident, $($err_var: ident),+) => {
        // Implement Display for ErrorVariant
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$err_var(message) => write!(f, "{}", message),
                    )+
                }
            }
        }
    }
}

macro_rules! impl_from_error {
    ($name: ident, $(($err_var: ident, $err_type: ty)),+) => {
        $(
            // Implement conversion from error to errorvariant
            impl From<$err_type> for $name {
                fn from(err: $err_type) -> Self {
                    $name::$err_var(err)
                }
            }
        )+
    }
}

/// Covers all errors that can occur in this Simulation
/// The errors are listed from very likely to be a user error from almost certainly an internal error.
#[derive(Debug)]
pub enum SimulationError {
    // Very likely to be user errors
    /// See [SetupError]
    SetupError(SetupError),
    /// See [CalcError]
    CalcError(CalcError),
    /// See [TimeError]
    TimeError(TimeError),

    // Highly unlikely to be user errors
    /// See [ConsistencyError]
    ConsistencyError(ConsistencyError),
    /// See [IndexError]
    IndexError(IndexError),
    /// Generic IO error, mostly coming from progress bar updates or render sinks
    IoError(std::io::Error),
    /// The worker pool could not be constructed
    ThreadingError(rayon::ThreadPoolBuildError),
}

impl_from_error! {SimulationError,
    (SetupError, SetupError),
    (CalcError, CalcError),
    (TimeError, TimeError),
    (ConsistencyError, ConsistencyError),
    (IndexError, IndexError),
    (IoError, std::io::Error),
    (ThreadingError, rayon::ThreadPoolBuildError)
}

impl_error_variant! {SimulationError,
    SetupError,
    CalcError,
    TimeError,
    ConsistencyError,
    IndexError,
    IoError,
    ThreadingError
}

// Implement the general error property
impl std::error::Error for SimulationError {}
