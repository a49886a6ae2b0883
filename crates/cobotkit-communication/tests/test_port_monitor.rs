//! Tests for port-list change detection.

use cobotkit_communication::{PortClass, PortMonitor, PortMonitorConfig, SerialPortInfo};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Snapshot = Vec<SerialPortInfo>;

fn fake_source() -> (Arc<Mutex<Snapshot>>, PortMonitor) {
    let current: Arc<Mutex<Snapshot>> = Arc::new(Mutex::new(Vec::new()));
    let view = Arc::clone(&current);
    let monitor = PortMonitor::with_source(
        PortMonitorConfig {
            poll_interval_ms: 10,
        },
        Arc::new(move || view.lock().unwrap().clone()),
    );
    (current, monitor)
}

fn usb_port(name: &str) -> SerialPortInfo {
    SerialPortInfo::new(name, "USB FTDI Serial Port", PortClass::Usb)
}

#[tokio::test]
async fn emits_once_per_change_and_never_when_stable() {
    let (current, monitor) = fake_source();
    let events: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    monitor.on_change(move |ports: &[SerialPortInfo]| sink.lock().unwrap().push(ports.to_vec()));

    monitor.start().await.unwrap();

    // Empty baseline, empty list: nothing to report.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.lock().unwrap().is_empty());

    // [] -> [P1]: exactly one event carrying the new list.
    *current.lock().unwrap() = vec![usb_port("P1")];
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![usb_port("P1")]);
    }

    // Stable list: no further events.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(events.lock().unwrap().len(), 1);

    // [P1] -> []: one more event.
    current.lock().unwrap().clear();
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_empty());
    }

    monitor.stop().await;
}

#[tokio::test]
async fn panicking_listener_does_not_stop_the_monitor() {
    let (current, monitor) = fake_source();
    monitor.on_change(|_: &[SerialPortInfo]| panic!("boom"));

    let events: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    monitor.on_change(move |ports: &[SerialPortInfo]| sink.lock().unwrap().push(ports.to_vec()));

    monitor.start().await.unwrap();

    // The panicking listener runs first on every change; the one after it
    // must still see both changes.
    *current.lock().unwrap() = vec![usb_port("P1")];
    tokio::time::sleep(Duration::from_millis(50)).await;
    *current.lock().unwrap() = vec![usb_port("P1"), usb_port("P2")];
    tokio::time::sleep(Duration::from_millis(50)).await;

    {
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![usb_port("P1")]);
        assert_eq!(seen[1], vec![usb_port("P1"), usb_port("P2")]);
    }

    monitor.stop().await;
}

#[tokio::test]
async fn seeded_baseline_suppresses_the_first_emission() {
    let (current, monitor) = fake_source();
    *current.lock().unwrap() = vec![usb_port("P1")];
    monitor.seed(vec![usb_port("P1")]);

    let events: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    monitor.on_change(move |ports: &[SerialPortInfo]| sink.lock().unwrap().push(ports.to_vec()));

    monitor.start().await.unwrap();

    // The list matches the seed, so nothing is reported.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.lock().unwrap().is_empty());

    // A later change is still reported.
    *current.lock().unwrap() = vec![usb_port("P1"), usb_port("P2")];
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        let seen = events.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![usb_port("P1"), usb_port("P2")]);
    }

    monitor.stop().await;
}

#[tokio::test]
async fn stop_halts_event_delivery() {
    let (current, monitor) = fake_source();
    let events: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    monitor.on_change(move |ports: &[SerialPortInfo]| sink.lock().unwrap().push(ports.to_vec()));

    monitor.start().await.unwrap();
    monitor.stop().await;

    *current.lock().unwrap() = vec![usb_port("P1")];
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn removed_listener_stops_receiving() {
    let (current, monitor) = fake_source();
    let events: Arc<Mutex<Vec<Snapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let handle =
        monitor.on_change(move |ports: &[SerialPortInfo]| sink.lock().unwrap().push(ports.to_vec()));

    assert!(monitor.remove_listener(&handle));
    assert!(!monitor.remove_listener(&handle));

    monitor.start().await.unwrap();
    *current.lock().unwrap() = vec![usb_port("P1")];
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.lock().unwrap().is_empty());

    monitor.stop().await;
}
