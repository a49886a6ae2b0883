//! In-memory device port for tests and demos
//!
//! Behaves like a serial device: bytes injected through the handle become
//! readable on the port, writes are captured, and replies can be scripted
//! per written command line. The handle side stays usable while the port
//! itself is owned by a `SerialManager`.

use crate::communication::DevicePort;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

#[derive(Default)]
struct VirtualPortState {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    write_line: String,
    replies: Vec<(String, Vec<u8>)>,
    open: bool,
}

/// A simulated serial device.
pub struct VirtualDevicePort {
    name: String,
    state: Arc<Mutex<VirtualPortState>>,
}

/// Test-side handle to a [`VirtualDevicePort`].
#[derive(Clone)]
pub struct VirtualPortHandle {
    state: Arc<Mutex<VirtualPortState>>,
}

impl VirtualDevicePort {
    /// Create an open virtual port and its controlling handle.
    pub fn new(name: impl Into<String>) -> (Self, VirtualPortHandle) {
        let state = Arc::new(Mutex::new(VirtualPortState {
            open: true,
            ..Default::default()
        }));
        (
            Self {
                name: name.into(),
                state: Arc::clone(&state),
            },
            VirtualPortHandle { state },
        )
    }
}

impl DevicePort for VirtualDevicePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        Ok(self.state.lock().incoming.len() as u32)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.incoming.len());
        for slot in buf.iter_mut().take(n) {
            *slot = state.incoming.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "port closed"));
        }
        state.written.extend_from_slice(data);

        // Fire scripted replies for each completed command line.
        let text = String::from_utf8_lossy(data).into_owned();
        state.write_line.push_str(&text);
        while let Some(pos) = state.write_line.find('\n') {
            let rest = state.write_line.split_off(pos + 1);
            let mut line = std::mem::replace(&mut state.write_line, rest);
            line.pop(); // '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(idx) = state.replies.iter().position(|(trigger, _)| *trigger == line) {
                let (_, reply) = state.replies.remove(idx);
                state.incoming.extend(reply);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().open = false;
        Ok(())
    }
}

impl VirtualPortHandle {
    /// Make `bytes` available for the next reads, as if the device sent them.
    pub fn inject(&self, bytes: &[u8]) {
        self.state.lock().incoming.extend(bytes.iter().copied());
    }

    /// Queue `reply` to be injected when the command line `trigger` is written.
    /// Each scripted reply fires once.
    pub fn reply_with(&self, trigger: impl Into<String>, reply: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .replies
            .push((trigger.into(), reply.into()));
    }

    /// All bytes written to the port so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Completed non-empty lines written to the port so far.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.state.lock().written)
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Whether the port is still open.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Simulate the device being unplugged.
    pub fn unplug(&self) {
        self.state.lock().open = false;
    }
}
