//! Communication layer for the robot arm serial link
//!
//! Components:
//! - [`serial`]: port enumeration and the `serialport`-backed device port
//! - [`manager`]: connection lifecycle, line reader task, command channel
//! - [`listeners`]: ordered line-listener registry with failure isolation
//! - [`monitor`]: background port-list change detection
//! - [`virtual_port`]: in-memory device port for tests and demos

pub mod listeners;
pub mod manager;
pub mod monitor;
pub mod serial;
pub mod virtual_port;

use std::io;
use std::time::Duration;

/// Default baud rate for the robot arm controller.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Settle interval after opening a port, covering the device boot/reset
/// delay before it is ready to talk.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// Parameters for opening a serial connection
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Native read timeout on the port (kept short; reads are polled)
    pub read_timeout: Duration,
    /// Delay between opening the port and enabling reads
    pub settle: Duration,
}

impl ConnectionParams {
    /// Create parameters with default timeouts for the given port and baud rate.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout: Duration::from_millis(10),
            settle: DEFAULT_SETTLE,
        }
    }
}

/// A duplex byte-stream connection to a physical or virtual serial device.
///
/// The trait keeps the manager independent of the `serialport` crate so the
/// whole pipeline can run against an in-memory port in tests.
pub trait DevicePort: Send {
    /// Device identifier this port was opened on.
    fn name(&self) -> &str;

    /// Whether the port is open.
    fn is_open(&self) -> bool;

    /// Number of bytes waiting in the receive buffer.
    fn bytes_to_read(&self) -> io::Result<u32>;

    /// Read available data into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data` to the device.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Close the port.
    fn close(&mut self) -> io::Result<()>;
}
