//! Robot arm protocol events
//!
//! Parses the bracketed status fragments the controller emits as lines.
//! The serial core never interprets line content; consumers (typically line
//! listeners feeding a UI bridge) call [`DeviceEvent::parse`] on each line
//! they receive.
//!
//! Observed tokens:
//! - `#STEP:<value>#` — program step update
//! - `#SAVEPOS#` — the teach button was pressed, record the current pose
//! - `#J<n>:<value>#` — position update for joint `n` (1-based on the wire)

use serde::{Deserialize, Serialize};

/// Number of joints on the arm.
pub const JOINT_COUNT: usize = 5;

/// A status event decoded from one protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Program step update (`#STEP:<value>#`); the value is reported
    /// lowercased, as the UI layer expects.
    Step {
        /// Step value, lowercased.
        value: String,
    },
    /// Request to record the current pose (`#SAVEPOS#`).
    SavePos,
    /// Joint position update (`#J<n>:<value>#`).
    JointPosition {
        /// Zero-based joint index (wire format is 1-based).
        joint: usize,
        /// Reported position.
        position: i32,
    },
}

impl DeviceEvent {
    /// Parse one published line into an event.
    ///
    /// Returns `None` for lines that are not status fragments, malformed
    /// fragments, and joint indices outside `1..=JOINT_COUNT`.
    pub fn parse(line: &str) -> Option<DeviceEvent> {
        let line = line.trim();
        if !line.starts_with('#') || !line.ends_with('#') || line.len() < 3 {
            return None;
        }
        let body = line.trim_matches('#');

        if body == "SAVEPOS" {
            return Some(DeviceEvent::SavePos);
        }

        if let Some(value) = body.strip_prefix("STEP:") {
            return Some(DeviceEvent::Step {
                value: value.to_lowercase(),
            });
        }

        if let Some(rest) = body.strip_prefix('J') {
            let (joint, value) = rest.split_once(':')?;
            let joint: usize = joint.parse().ok()?;
            if !(1..=JOINT_COUNT).contains(&joint) {
                return None;
            }
            let position: i32 = value.trim().parse().ok()?;
            return Some(DeviceEvent::JointPosition {
                joint: joint - 1,
                position,
            });
        }

        None
    }
}
