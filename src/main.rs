//! Device console for the robot arm serial link.
//!
//! Without arguments: print the available ports and watch for changes.
//! With a port name (and optional baud rate): connect, log every line the
//! device sends, decode protocol events, and forward stdin lines as commands.

use cobotkit::{
    init_logging, list_ports, ConnectionParams, DeviceEvent, PortMonitor, PortMonitorConfig,
    SerialManager, SerialPortInfo, BUILD_DATE, DEFAULT_BAUD_RATE, VERSION,
};
use tokio::io::AsyncBufReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("CobotKit v{} (built {})", VERSION, BUILD_DATE);

    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(port) => {
            let baud = match args.next() {
                Some(baud) => baud.parse()?,
                None => DEFAULT_BAUD_RATE,
            };
            run_console(&port, baud).await
        }
        None => watch_ports().await,
    }
}

/// Interactive session against a connected device.
async fn run_console(port: &str, baud: u32) -> anyhow::Result<()> {
    let manager = SerialManager::new();

    manager.add_listener_fn(|line| println!("<<< {}", line));
    manager.add_listener_fn(|line| {
        if let Some(event) = DeviceEvent::parse(line) {
            match serde_json::to_string(&event) {
                Ok(json) => println!("evt {}", json),
                Err(e) => tracing::warn!("failed to serialize event: {}", e),
            }
        }
    });

    manager.connect(&ConnectionParams::new(port, baud)).await?;
    println!("Connected to {} at {} bps. Type commands, EOF to quit.", port, baud);

    // Ask the controller to report its mode and pose.
    if let Err(e) = manager.send("M:P") {
        tracing::warn!("greeting failed: {}", e);
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = manager.send(line) {
            tracing::error!("send failed: {}", e);
            break;
        }
        println!(">>> {}", line);
    }

    manager.disconnect().await;
    Ok(())
}

/// Print the current port list, then print it again whenever it changes.
async fn watch_ports() -> anyhow::Result<()> {
    let initial = list_ports()?;
    print_ports(&initial);

    let monitor = PortMonitor::new(PortMonitorConfig::default());
    // The list was just printed; only re-print once it differs.
    monitor.seed(initial);
    monitor.on_change(|ports: &[SerialPortInfo]| print_ports(ports));
    monitor.start().await?;

    println!("Watching for serial ports (Ctrl-C to exit)...");
    tokio::signal::ctrl_c().await?;
    monitor.stop().await;
    Ok(())
}

fn print_ports(ports: &[SerialPortInfo]) {
    if ports.is_empty() {
        println!("No serial ports available.");
    } else {
        println!("Available ports:");
        for port in ports {
            println!("  {} - {}", port.port_name, port.class);
        }
    }
}
