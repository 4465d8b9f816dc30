//! The wire envelope.
//!
//! Every message exchanged between peers is one [`Envelope`], encoded as a
//! JSON object whose `type` field names the kind:
//!
//! ```text
//! {"type":"input","event_type":"mouse_move","data":{"x":100,"y":200}}
//! {"type":"handoff","edge":"left","entry":{"x":1910,"y":540}}
//! {"type":"ping","timestamp":1700000000000}
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::event::InputEvent;
use crate::screen::{Point, ScreenEdge};

/// Top-level message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// A captured input event forwarded by the active device.
    Input(InputEvent),

    /// Active status is moving to the receiver.
    Handoff {
        /// Edge of the sender's screen the cursor left through.
        edge: ScreenEdge,
        /// Where the cursor should appear on the receiver's screen.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entry: Option<Point>,
    },

    /// Liveness probe.
    Ping {
        /// Milliseconds since the Unix epoch at send time.
        timestamp: u64,
    },

    /// Reply to a ping, echoing its timestamp.
    Pong { timestamp: u64 },

    /// The sender's identity and screen geometry.
    DeviceInfo(DeviceInfo),

    /// A `type` this build does not understand.
    #[serde(other)]
    Unknown,
}

impl Envelope {
    /// Wire name of the envelope kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Handoff { .. } => "handoff",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::DeviceInfo(_) => "device_info",
            Self::Unknown => "unknown",
        }
    }

    /// A ping stamped with the current time.
    #[must_use]
    pub fn ping() -> Self {
        Self::Ping {
            timestamp: unix_millis(),
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ScreenInfo;
    use crate::event::{Key, MouseButton};
    use crate::screen::ScreenGeometry;
    use serde_json::json;

    fn json_roundtrip(envelope: &Envelope) -> Envelope {
        let text = serde_json::to_string(envelope).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn input_is_flattened() {
        let envelope = Envelope::Input(InputEvent::MouseMove { x: 100, y: 200 });
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"type": "input", "event_type": "mouse_move", "data": {"x": 100, "y": 200}})
        );
        assert_eq!(json_roundtrip(&envelope), envelope);
    }

    #[test]
    fn handoff_roundtrip() {
        let envelope = Envelope::Handoff {
            edge: ScreenEdge::Left,
            entry: Some(Point::new(1910, 540)),
        };
        assert_eq!(json_roundtrip(&envelope), envelope);
    }

    #[test]
    fn handoff_without_entry() {
        let envelope: Envelope = serde_json::from_value(json!({"type": "handoff", "edge": "right"})).unwrap();
        assert_eq!(
            envelope,
            Envelope::Handoff {
                edge: ScreenEdge::Right,
                entry: None,
            }
        );
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"type": "handoff", "edge": "right"})
        );
    }

    #[test]
    fn ping_pong_keep_timestamp() {
        let ping = Envelope::Ping { timestamp: 42 };
        assert_eq!(
            serde_json::to_value(&ping).unwrap(),
            json!({"type": "ping", "timestamp": 42})
        );
        assert_eq!(json_roundtrip(&Envelope::Pong { timestamp: 42 }), Envelope::Pong { timestamp: 42 });
    }

    #[test]
    fn device_info_roundtrip() {
        let envelope = Envelope::DeviceInfo(DeviceInfo::new(
            "laptop",
            "macos",
            vec![ScreenInfo::from_geometry(ScreenGeometry::new(2560, 1600), "Built-in")],
        ));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "device_info");
        assert_eq!(value["screen_count"], 1);
        assert_eq!(json_roundtrip(&envelope), envelope);
    }

    #[test]
    fn key_and_click_roundtrip() {
        for envelope in [
            Envelope::Input(InputEvent::KeyPress { key: Key::Char('é') }),
            Envelope::Input(InputEvent::MouseClick {
                x: 5,
                y: 6,
                button: MouseButton::Right,
                pressed: false,
            }),
        ] {
            assert_eq!(json_roundtrip(&envelope), envelope);
        }
    }

    #[test]
    fn unknown_kind() {
        let envelope: Envelope =
            serde_json::from_value(json!({"type": "file_transfer", "name": "a.txt"})).unwrap();
        assert_eq!(envelope, Envelope::Unknown);
        assert_eq!(envelope.kind(), "unknown");
    }

    #[test]
    fn ping_is_stamped() {
        match Envelope::ping() {
            Envelope::Ping { timestamp } => assert!(timestamp > 0),
            other => panic!("expected Ping, got {other:?}"),
        }
    }
}
