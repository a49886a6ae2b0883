//! Tests for protocol event parsing.

use cobotkit_communication::DeviceEvent;

#[test]
fn parses_step_update() {
    assert_eq!(
        DeviceEvent::parse("#STEP:10#"),
        Some(DeviceEvent::Step {
            value: "10".to_string()
        })
    );
}

#[test]
fn step_value_is_lowercased() {
    assert_eq!(
        DeviceEvent::parse("#STEP:A2#"),
        Some(DeviceEvent::Step {
            value: "a2".to_string()
        })
    );
}

#[test]
fn parses_savepos_trigger() {
    assert_eq!(DeviceEvent::parse("#SAVEPOS#"), Some(DeviceEvent::SavePos));
}

#[test]
fn parses_joint_position_zero_based() {
    assert_eq!(
        DeviceEvent::parse("#J3:120#"),
        Some(DeviceEvent::JointPosition {
            joint: 2,
            position: 120
        })
    );
    assert_eq!(
        DeviceEvent::parse("#J1:-15#"),
        Some(DeviceEvent::JointPosition {
            joint: 0,
            position: -15
        })
    );
}

#[test]
fn rejects_out_of_range_joints() {
    assert_eq!(DeviceEvent::parse("#J0:10#"), None);
    assert_eq!(DeviceEvent::parse("#J6:10#"), None);
}

#[test]
fn rejects_malformed_fragments() {
    assert_eq!(DeviceEvent::parse("hello"), None);
    assert_eq!(DeviceEvent::parse("#J2:abc#"), None);
    assert_eq!(DeviceEvent::parse("#J2#"), None);
    assert_eq!(DeviceEvent::parse("#"), None);
    assert_eq!(DeviceEvent::parse(""), None);
}

#[test]
fn events_serialize_for_the_ui_bridge() {
    let json = serde_json::to_string(&DeviceEvent::JointPosition {
        joint: 2,
        position: 120,
    })
    .unwrap();
    assert!(json.contains("\"joint\":2"));
    assert!(json.contains("\"position\":120"));
}
