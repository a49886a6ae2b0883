//! # CobotKit Communication
//!
//! Serial-link communication core for CobotKit.
//! Owns the byte-stream connection to the robot arm, reconverts the stream
//! into discrete protocol lines, fans lines out to registered listeners,
//! layers synchronous request/response exchanges on top of the same stream,
//! and monitors device presence without blocking the rest of the application.

pub mod communication;
pub mod protocol;

pub use communication::{
    listeners::{LineListener, LineListenerRegistry, ListenerHandle},
    manager::{CommandOptions, SerialManager},
    monitor::{PortListListener, PortMonitor, PortMonitorConfig},
    serial::{list_ports, PortClass, RealSerialPort, SerialPortInfo},
    virtual_port::{VirtualDevicePort, VirtualPortHandle},
    ConnectionParams, DevicePort, DEFAULT_BAUD_RATE, DEFAULT_SETTLE,
};

pub use protocol::DeviceEvent;
