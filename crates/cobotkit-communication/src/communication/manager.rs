//! Serial connection manager
//!
//! Owns the device port for one connection, runs the line reader task that
//! converts the byte stream back into discrete lines, and layers a
//! synchronous bracketed request/response channel on top of the same stream.
//!
//! Concurrency model: exactly one line reader task per open connection and
//! one optional in-flight `send_and_wait` call. The raw accumulation buffer
//! is single-writer (the reader task); the command channel only ever reads
//! it. All state is instance-scoped, so multiple managers are independent.

use crate::communication::listeners::{LineListener, LineListenerRegistry, ListenerHandle};
use crate::communication::serial::{self, RealSerialPort};
use crate::communication::{ConnectionParams, DevicePort};
use cobotkit_core::types::{thread_safe, thread_safe_none, ThreadSafe, ThreadSafeOption};
use cobotkit_core::{ConnectionError, Result};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Poll period for the line reader task and the command channel scan.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Options for a bracketed request/response exchange.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    /// Marker that opens the reply payload.
    pub start_marker: String,
    /// Marker that closes the reply payload. May equal `start_marker`;
    /// the scan looks for it strictly after the start marker.
    pub end_marker: String,
    /// How long to wait for a complete bracketed reply.
    pub timeout: Duration,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            start_marker: "#".to_string(),
            end_marker: "#".to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Manager for one serial connection to the robot arm.
pub struct SerialManager {
    /// The device port, present while the connection is open.
    port: ThreadSafeOption<Box<dyn DevicePort>>,
    /// All bytes received since the last explicit clear; scanned by the
    /// command channel, appended to only by the reader task.
    raw_buffer: ThreadSafe<String>,
    /// Subscribers notified for every published line.
    listeners: LineListenerRegistry,
    /// Stop signal for the reader task, observed every poll interval.
    reader_stop: Arc<AtomicBool>,
    /// Handle of the running reader task, if any.
    reader_task: ThreadSafeOption<JoinHandle<()>>,
}

impl SerialManager {
    /// Create a manager with no open connection.
    pub fn new() -> Self {
        Self {
            port: thread_safe_none(),
            raw_buffer: thread_safe(String::new()),
            listeners: LineListenerRegistry::new(),
            reader_stop: Arc::new(AtomicBool::new(false)),
            reader_task: thread_safe_none(),
        }
    }

    /// Register a listener notified for every published line.
    pub fn add_listener(&self, listener: Arc<dyn LineListener>) -> ListenerHandle {
        self.listeners.add_listener(listener)
    }

    /// Register a closure notified for every published line.
    pub fn add_listener_fn<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.listeners.add_listener_fn(f)
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, handle: &ListenerHandle) -> bool {
        self.listeners.remove_listener(handle)
    }

    /// Open a serial connection and start the line reader.
    ///
    /// An already-open connection is disconnected first. After opening, the
    /// settle interval from `params` elapses before reads are enabled (the
    /// controller resets when the port opens and drops bytes while booting).
    /// On failure the connection is left closed.
    pub async fn connect(&self, params: &ConnectionParams) -> Result<()> {
        self.disconnect().await;
        let port = RealSerialPort::open(params)?;
        self.attach(Box::new(port), params.settle).await
    }

    /// Start a connection over an already-open device port.
    ///
    /// Used by `connect` and directly by tests and demos with a virtual port.
    pub async fn attach(&self, port: Box<dyn DevicePort>, settle: Duration) -> Result<()> {
        self.disconnect().await;

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let name = port.name().to_string();
        self.raw_buffer.lock().clear();
        *self.port.lock() = Some(port);
        self.reader_stop.store(false, Ordering::SeqCst);

        let handle = tokio::spawn(Self::reader_loop(
            Arc::clone(&self.port),
            Arc::clone(&self.raw_buffer),
            self.listeners.clone(),
            Arc::clone(&self.reader_stop),
        ));
        *self.reader_task.lock() = Some(handle);

        tracing::info!(port = %name, "connection open, line reader started");
        Ok(())
    }

    /// Close the connection. Idempotent.
    ///
    /// Signals the reader task to stop and waits for it to exit before
    /// closing the port, so no line can be published after this returns.
    pub async fn disconnect(&self) {
        self.reader_stop.store(true, Ordering::SeqCst);

        let task = self.reader_task.lock().take();
        if let Some(handle) = task {
            if let Err(e) = handle.await {
                tracing::warn!("line reader task ended abnormally: {}", e);
            }
        }

        let port = self.port.lock().take();
        if let Some(mut port) = port {
            if let Err(e) = port.close() {
                tracing::warn!("failed to close {}: {}", port.name(), e);
            }
            tracing::info!(port = %port.name(), "disconnected");
        }
    }

    /// Whether the connection is open and the device is still present.
    ///
    /// Checks both that the port reports open and that its identifier still
    /// appears in the current enumeration; the OS does not always surface a
    /// silent unplug as a close event.
    pub fn is_connected(&self) -> bool {
        let name = {
            let guard = self.port.lock();
            match guard.as_ref() {
                Some(port) if port.is_open() => port.name().to_string(),
                _ => return false,
            }
        };

        serial::list_ports()
            .map(|ports| ports.iter().any(|p| p.port_name == name))
            .unwrap_or(false)
    }

    /// Send one line to the device (a newline is appended).
    ///
    /// Errors with `ConnectionError::NotConnected` when no port is attached,
    /// and `ConnectionError::ConnectionLost` when a port is attached but no
    /// longer open (e.g., unplugged mid-session).
    pub fn send(&self, msg: &str) -> Result<()> {
        let mut guard = self.port.lock();
        let port = match guard.as_mut() {
            Some(port) if port.is_open() => port,
            Some(port) => {
                return Err(ConnectionError::ConnectionLost {
                    reason: format!("{} is no longer open", port.name()),
                }
                .into())
            }
            None => return Err(ConnectionError::NotConnected.into()),
        };

        port.write_all(format!("{}\n", msg).as_bytes())
            .map_err(|e| ConnectionError::IoError {
                reason: e.to_string(),
            })?;
        Ok(())
    }

    /// Current contents of the raw accumulation buffer.
    pub fn raw_buffer(&self) -> String {
        self.raw_buffer.lock().clone()
    }

    /// Clear the raw accumulation buffer.
    pub fn clear_buffer(&self) {
        self.raw_buffer.lock().clear();
    }

    /// Send a command and wait for a bracketed reply.
    ///
    /// Returns `Ok(None)` immediately when no connection is open, and
    /// `Ok(None)` when no complete reply arrives within the timeout; a
    /// missing reply is absence, not an error. Write failures do error.
    ///
    /// The reply payload is the text strictly between the first start marker
    /// and the first end marker after it, so identical start and end markers
    /// work: a reply line `#STEP:10#` with the default markers yields
    /// `STEP:10`.
    ///
    /// One call at a time; overlapping calls share the raw buffer and their
    /// interleaving is undefined.
    pub async fn send_and_wait(
        &self,
        command: &str,
        options: &CommandOptions,
    ) -> Result<Option<String>> {
        if !self.port_open() {
            return Ok(None);
        }

        self.clear_buffer();
        self.send(command)?;

        let deadline = Instant::now() + options.timeout;
        loop {
            let data = self.raw_buffer();
            if let Some(payload) =
                extract_bracketed(&data, &options.start_marker, &options.end_marker)
            {
                return Ok(Some(payload.to_string()));
            }
            if Instant::now() >= deadline {
                tracing::debug!(command, timeout = ?options.timeout, "no bracketed reply");
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn port_open(&self) -> bool {
        self.port
            .lock()
            .as_ref()
            .map(|p| p.is_open())
            .unwrap_or(false)
    }

    /// Background loop draining the port into lines.
    ///
    /// Each iteration reads exactly the bytes the port reports as available,
    /// decodes them lossily, appends to the raw buffer and a local line
    /// buffer, and publishes every complete line. Read errors are logged and
    /// skipped; only the stop flag ends the loop. The port lock is held only
    /// for the read itself, never across the sleep.
    async fn reader_loop(
        port: ThreadSafeOption<Box<dyn DevicePort>>,
        raw_buffer: ThreadSafe<String>,
        listeners: LineListenerRegistry,
        stop: Arc<AtomicBool>,
    ) {
        let mut line_buffer = String::new();
        tracing::debug!("line reader started");

        loop {
            if stop.load(Ordering::SeqCst) {
                break;
            }

            if let Some(text) = Self::drain_port(&port) {
                raw_buffer.lock().push_str(&text);
                line_buffer.push_str(&text);

                while let Some(pos) = line_buffer.find('\n') {
                    let rest = line_buffer.split_off(pos + 1);
                    let mut line = std::mem::replace(&mut line_buffer, rest);
                    line.pop(); // '\n'
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    if !line.is_empty() {
                        listeners.notify(&line);
                    }
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }

        tracing::debug!("line reader stopped");
    }

    /// Read whatever the port has buffered, decoded lossily.
    fn drain_port(port: &ThreadSafeOption<Box<dyn DevicePort>>) -> Option<String> {
        let mut guard = port.lock();
        let port = guard.as_mut()?;
        if !port.is_open() {
            return None;
        }

        let available = match port.bytes_to_read() {
            Ok(0) => return None,
            Ok(n) => n as usize,
            Err(e) => {
                tracing::warn!("failed to query serial input: {}", e);
                return None;
            }
        };

        let mut buf = vec![0u8; available];
        match port.read(&mut buf) {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => None,
            Err(e) => {
                tracing::warn!("serial read failed: {}", e);
                None
            }
        }
    }
}

impl Default for SerialManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the text strictly between the first `start` and the first `end`
/// after it. When `start == end` the end scan begins after the start
/// occurrence, so a single bracketed token does not collapse to empty.
fn extract_bracketed<'a>(data: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let start_idx = data.find(start)?;
    let after = start_idx + start.len();
    let rel = data[after..].find(end)?;
    Some(&data[after..after + rel])
}

#[cfg(test)]
mod tests {
    use super::extract_bracketed;

    #[test]
    fn identical_markers_do_not_collapse() {
        assert_eq!(extract_bracketed("#STEP:10#", "#", "#"), Some("STEP:10"));
    }

    #[test]
    fn payload_between_first_pair_only() {
        assert_eq!(extract_bracketed("x#a#y#b#", "#", "#"), Some("a"));
    }

    #[test]
    fn distinct_markers() {
        assert_eq!(extract_bracketed("ok [J1:90] done", "[", "]"), Some("J1:90"));
    }

    #[test]
    fn incomplete_reply_is_absent() {
        assert_eq!(extract_bracketed("#STEP:10", "#", "#"), None);
        assert_eq!(extract_bracketed("no markers", "#", "#"), None);
    }
}
