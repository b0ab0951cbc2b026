#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! This crate collects the concepts which govern the agents of the
//! [mitosim](https://docs.rs/mitosim) tissue simulation engine: geometric
//! primitives, transient forces, the agent capability trait together with its
//! read-only shadow projection, and the cell-cycle phase machine.
//!
//! The engine which schedules these concepts lives in `mitosim-core`, concrete
//! agent models in `mitosim-building-blocks`.

mod agent;
mod cycle;
mod errors;
mod geometry;

pub use agent::*;
pub use cycle::*;
pub use errors::*;
pub use geometry::*;
