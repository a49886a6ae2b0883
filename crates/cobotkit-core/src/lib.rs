//! # CobotKit Core
//!
//! Core types and utilities shared by the CobotKit crates.
//! Provides the error taxonomy for the serial link and the
//! thread-safe shared-state aliases used by its background tasks.

pub mod error;
pub mod types;

pub use error::{ConnectionError, Error, Result};

// Re-export type aliases for convenience
pub use types::{
    thread_safe, thread_safe_none, thread_safe_vec, ThreadSafe, ThreadSafeOption, ThreadSafeVec,
};
