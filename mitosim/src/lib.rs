#![warn(missing_docs)]
//! [mitosim](crate) simulates populations of biological cell nuclei as
//! multi-sphere agents which keep a rigid shape, cycle through the cell
//! cycle and push each other around through contact and repulsion forces,
//! advanced in fixed time steps over a pool of worker threads.
//!
//! The workspace is split the same way its crates are meant to be used:
//! [concepts] holds the shared traits and value types, [core] the scheduling
//! engine, and [building_blocks] the concrete agent models.

pub use mitosim_building_blocks as building_blocks;

pub use mitosim_concepts as concepts;

pub use mitosim_core as core;

/// Re-exports the default simulation types and traits.
pub mod prelude;
