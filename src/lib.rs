//! # CobotKit
//!
//! Serial-link controller core for 5-joint collaborative robot arms.
//!
//! ## Architecture
//!
//! CobotKit is organized as a workspace:
//!
//! 1. **cobotkit-core** - Error taxonomy and shared-state aliases
//! 2. **cobotkit-communication** - Port enumeration, connection lifecycle,
//!    line reader, command channel, port monitor, protocol events
//! 3. **cobotkit** - Device console binary that wires the core to a terminal

pub use cobotkit_communication::{
    list_ports, CommandOptions, ConnectionParams, DeviceEvent, DevicePort, LineListener,
    LineListenerRegistry, ListenerHandle, PortClass, PortListListener, PortMonitor,
    PortMonitorConfig, RealSerialPort, SerialManager, SerialPortInfo, VirtualDevicePort,
    VirtualPortHandle, DEFAULT_BAUD_RATE,
};

pub use cobotkit_core::{ConnectionError, Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    Ok(())
}
