//! Error handling for CobotKit
//!
//! The serial link distinguishes two kinds of failure:
//! - Connection errors (open/send failures) surface to the caller.
//! - Steady-state loop errors (a single bad read, a panicking listener)
//!   are logged and absorbed so the background tasks stay alive.
//!
//! Command timeouts are not errors at all: a missing bracketed reply is
//! reported as absence (`None`) by the command channel.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Represents errors related to communication with the robot arm over
/// a serial device, including port enumeration and open/write failures.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// No connection is open
    #[error("Not connected")]
    NotConnected,

    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Serial port error
    #[error("Serial port error: {reason}")]
    SerialError {
        /// The reason for the serial port error.
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },
}

/// Main error type for CobotKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
