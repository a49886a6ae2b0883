//! Shared type definitions.

pub mod aliases;

pub use aliases::*;
