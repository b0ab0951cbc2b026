#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! The engine of the [mitosim](https://docs.rs/mitosim) tissue simulation:
//! a fixed-size worker pool fed through a shared cursor, broad-phase neighbor
//! discovery over published population snapshots, a fixed-step clock with
//! exposure events and the scheduler which drives agents through the two
//! force phases of every step.
//!
//! Agent capabilities and shared value types live in `mitosim-concepts`,
//! concrete agent models in `mitosim-building-blocks`.

pub mod errors;
pub mod neighbors;
pub mod parallel;
pub mod simulation;
pub mod time;

#[doc(hidden)]
pub use rayon;
