#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
//! Concrete agent models for the [mitosim](https://docs.rs/mitosim) tissue
//! simulation engine, built on the traits of `mitosim-concepts`.
//!
//! Currently this covers the rigid multi-sphere nucleus together with a
//! simple cycle-driven growth model.

pub mod nucleus;

pub use nucleus::*;
