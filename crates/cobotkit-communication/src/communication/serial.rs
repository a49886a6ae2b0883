//! Serial port enumeration and hardware-backed device port
//!
//! Provides low-level serial port operations for direct connection to the
//! robot arm controller via USB, Bluetooth SPP, or a plain UART.
//!
//! Supports:
//! - Port enumeration with a coarse connection-type classification
//! - Baud rate configuration
//! - Non-blocking polled reads (short native timeout)

use crate::communication::{ConnectionParams, DevicePort};
use cobotkit_core::{ConnectionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// Coarse classification of how a serial device is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortClass {
    /// USB serial adapter or CDC-ACM device
    Usb,
    /// Bluetooth serial (SPP) link
    Bluetooth,
    /// Anything else (onboard UART, PCI, unknown)
    Generic,
}

impl fmt::Display for PortClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usb => write!(f, "Serial Device (USB)"),
            Self::Bluetooth => write!(f, "Serial Device (Bluetooth)"),
            Self::Generic => write!(f, "Serial Device"),
        }
    }
}

/// Information about an available serial port
///
/// A value type recomputed in full on every enumeration; no identity
/// persists across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB FTDI Serial Port")
    pub description: String,

    /// Connection-type classification
    pub class: PortClass,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(
        port_name: impl Into<String>,
        description: impl Into<String>,
        class: PortClass,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            class,
        }
    }

    fn from_system(port: &serialport::SerialPortInfo) -> Self {
        let description = describe_port(port);
        let class = classify_port(port, &description);
        Self::new(&port.port_name, description, class)
    }
}

/// List available serial ports on the system
///
/// Returns the current snapshot of ports with a human-readable description
/// and classification. Pure function of OS/driver state at call time.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports.iter().map(SerialPortInfo::from_system).collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(ConnectionError::SerialError {
                reason: format!("Failed to enumerate ports: {}", e),
            }
            .into())
        }
    }
}

/// Get a user-friendly description for a port
fn describe_port(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Classify a port from its reported type, falling back to description tokens
/// for drivers that only expose a free-form description.
fn classify_port(port: &serialport::SerialPortInfo, description: &str) -> PortClass {
    match port.port_type {
        serialport::SerialPortType::UsbPort(_) => PortClass::Usb,
        serialport::SerialPortType::BluetoothPort => PortClass::Bluetooth,
        _ if description.contains("USB") => PortClass::Usb,
        _ if description.contains("Bluetooth") => PortClass::Bluetooth,
        _ => PortClass::Generic,
    }
}

/// Real serial port implementation using the serialport crate
pub struct RealSerialPort {
    name: String,
    port: Box<dyn serialport::SerialPort>,
    open: bool,
}

impl RealSerialPort {
    /// Open a serial port with the given parameters
    ///
    /// The native read timeout is kept short; the line reader polls
    /// `bytes_to_read` and never issues a blocking read for data that
    /// is not already buffered.
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        let builder = serialport::new(&params.port, params.baud_rate)
            .timeout(params.read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(port) => {
                tracing::info!(port = %params.port, baud = params.baud_rate, "serial port opened");
                Ok(Self {
                    name: params.port.clone(),
                    port,
                    open: true,
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                Err(ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }
}

impl DevicePort for RealSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        self.port.bytes_to_read().map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // The handle is dropped by the manager; marking closed is enough.
        self.open = false;
        Ok(())
    }
}
