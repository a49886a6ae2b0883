//! Port monitor
//!
//! Background loop that polls the port enumerator on a fixed interval,
//! compares each snapshot to the previous one by value, and notifies
//! listeners only when the list changed. The baseline starts empty, so the
//! first poll that sees any port emits.

use crate::communication::listeners::{panic_reason, ListenerHandle};
use crate::communication::serial::{self, SerialPortInfo};
use cobotkit_core::types::{
    thread_safe, thread_safe_none, thread_safe_vec, ThreadSafe, ThreadSafeOption, ThreadSafeVec,
};
use cobotkit_core::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for the port monitor
#[derive(Debug, Clone)]
pub struct PortMonitorConfig {
    /// Interval between enumeration polls, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for PortMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

/// A subscriber notified whenever the enumerated port list changes.
pub trait PortListListener: Send + Sync {
    /// Called with the new list after a change was detected.
    fn on_ports_changed(&self, ports: &[SerialPortInfo]);
}

impl<F> PortListListener for F
where
    F: Fn(&[SerialPortInfo]) + Send + Sync,
{
    fn on_ports_changed(&self, ports: &[SerialPortInfo]) {
        self(ports)
    }
}

/// Source of port-list snapshots, injectable for tests.
type PortListSource = Arc<dyn Fn() -> Vec<SerialPortInfo> + Send + Sync>;

/// Watches the system port list for additions and removals.
pub struct PortMonitor {
    config: PortMonitorConfig,
    source: PortListSource,
    listeners: ThreadSafeVec<(ListenerHandle, Arc<dyn PortListListener>)>,
    baseline: ThreadSafe<Vec<SerialPortInfo>>,
    stop: Arc<AtomicBool>,
    task: ThreadSafeOption<JoinHandle<()>>,
}

impl PortMonitor {
    /// Create a monitor backed by the system port enumerator.
    pub fn new(config: PortMonitorConfig) -> Self {
        Self::with_source(
            config,
            Arc::new(|| match serial::list_ports() {
                Ok(ports) => ports,
                Err(e) => {
                    tracing::warn!("port enumeration failed: {}", e);
                    Vec::new()
                }
            }),
        )
    }

    /// Create a monitor over a caller-supplied enumeration source.
    pub fn with_source(config: PortMonitorConfig, source: PortListSource) -> Self {
        Self {
            config,
            source,
            listeners: thread_safe_vec(),
            baseline: thread_safe(Vec::new()),
            stop: Arc::new(AtomicBool::new(false)),
            task: thread_safe_none(),
        }
    }

    /// Replace the comparison baseline, typically with a snapshot the caller
    /// has already shown to the user, so the first poll emits only if the
    /// list has changed since that snapshot.
    pub fn seed(&self, ports: Vec<SerialPortInfo>) {
        *self.baseline.lock() = ports;
    }

    /// Register a change listener.
    pub fn add_listener(&self, listener: Arc<dyn PortListListener>) -> ListenerHandle {
        let handle = ListenerHandle::new();
        self.listeners.lock().push((handle.clone(), listener));
        handle
    }

    /// Register a closure as a change listener.
    pub fn on_change<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&[SerialPortInfo]) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(f))
    }

    /// Remove a previously registered change listener.
    pub fn remove_listener(&self, handle: &ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| h != handle);
        listeners.len() < before
    }

    /// Start the polling loop. Calling `start` on a running monitor is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }

        self.stop.store(false, Ordering::SeqCst);
        let source = Arc::clone(&self.source);
        let listeners = Arc::clone(&self.listeners);
        let baseline = Arc::clone(&self.baseline);
        let stop = Arc::clone(&self.stop);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        *task = Some(tokio::spawn(async move {
            tracing::debug!("port monitor started");
            loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }

                let ports = (source)();
                let changed = {
                    let mut base = baseline.lock();
                    if *base != ports {
                        *base = ports.clone();
                        true
                    } else {
                        false
                    }
                };

                if changed {
                    tracing::debug!(count = ports.len(), "port list changed");
                    let snapshot: Vec<Arc<dyn PortListListener>> =
                        listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
                    for listener in snapshot {
                        // Isolate failing subscribers so the monitor survives.
                        if let Err(payload) =
                            catch_unwind(AssertUnwindSafe(|| listener.on_ports_changed(&ports)))
                        {
                            tracing::error!(
                                "port listener panicked: {}",
                                panic_reason(payload.as_ref())
                            );
                        }
                    }
                }

                tokio::time::sleep(interval).await;
            }
            tracing::debug!("port monitor stopped");
        }));

        Ok(())
    }

    /// Stop the polling loop and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let task = self.task.lock().take();
        if let Some(handle) = task {
            if let Err(e) = handle.await {
                tracing::warn!("port monitor task ended abnormally: {}", e);
            }
        }
    }
}
