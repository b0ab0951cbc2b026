use core::fmt::Display;
use std::error::Error;

macro_rules! define_errors {
    ($(($err_name: ident, $err_descr: expr)),+) => {
        $(
            #[doc = $err_descr]
            #[derive(Debug,Clone)]
            pub struct $err_name(
                #[doc = "Error message associated with "]
                #[doc = stringify!($err_name)]
                #[doc = " error type."]
                pub String,
            );

            impl Display for $err_name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl Error for $err_name {}

            impl From<String> for $err_name {
                fn from(value: String) -> Self {
                    $err_name(value)
                }
            }
        )+
    }
}

define_errors!(
    (
        ConsistencyError,
        "A logic or scheduling bug was detected (eg. cell-cycle time moving backwards); \
        non-recoverable, the enclosing run must abort"
    ),
    (
        SetupError,
        "Occurs when constructing an agent or the simulation with invalid configuration; \
        rejected before the object enters the simulation"
    ),
    (CalcError, "General calculation error"),
    (
        TimeError,
        "Error related to advancing the simulation time"
    ),
    (
        IndexError,
        "Can occur internally when information is not present at the expected place"
    )
);

impl From<CalcError> for SetupError {
    fn from(value: CalcError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<ConsistencyError> for SetupError {
    fn from(value: ConsistencyError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<ConsistencyError> for CalcError {
    fn from(value: ConsistencyError) -> Self {
        CalcError(format!("{}", value))
    }
}
