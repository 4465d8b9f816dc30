//! Input event types.
//!
//! Transport-agnostic descriptions of one peripheral action. On the wire an
//! event is `{"event_type": ..., "data": {...}}` with a data shape that
//! depends on the event type.

use serde::{Deserialize, Serialize};

/// A transport-agnostic input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum InputEvent {
    /// Absolute pointer position.
    MouseMove { x: i32, y: i32 },

    /// Mouse button press or release at a position.
    MouseClick {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        button: MouseButton,
        pressed: bool,
    },

    /// Scroll wheel.
    MouseScroll {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        dx: i32,
        dy: i32,
    },

    /// Key pressed.
    KeyPress { key: Key },

    /// Key released.
    KeyRelease { key: Key },
}

impl InputEvent {
    /// Wire name of the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MouseMove { .. } => "mouse_move",
            Self::MouseClick { .. } => "mouse_click",
            Self::MouseScroll { .. } => "mouse_scroll",
            Self::KeyPress { .. } => "key_press",
            Self::KeyRelease { .. } => "key_release",
        }
    }

    #[must_use]
    pub fn is_mouse(&self) -> bool {
        matches!(
            self,
            Self::MouseMove { .. } | Self::MouseClick { .. } | Self::MouseScroll { .. }
        )
    }

    #[must_use]
    pub fn is_keyboard(&self) -> bool {
        matches!(self, Self::KeyPress { .. } | Self::KeyRelease { .. })
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

/// Serialized key descriptor.
///
/// Either a literal character (`{"type": "char", "value": "a"}`) or a named
/// symbolic key (`{"type": "special", "value": "shift"}`). Keys the capture
/// side could not describe travel as `unknown` and are skipped by injectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Key {
    Char(char),
    Special(String),
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mouse_move_wire_shape() {
        let event = InputEvent::MouseMove { x: 100, y: 200 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event_type": "mouse_move", "data": {"x": 100, "y": 200}})
        );
    }

    #[test]
    fn click_defaults_missing_coordinates() {
        let value = json!({
            "event_type": "mouse_click",
            "data": {"button": "left", "pressed": true}
        });
        let event: InputEvent = serde_json::from_value(value).unwrap();
        assert_eq!(
            event,
            InputEvent::MouseClick {
                x: 0,
                y: 0,
                button: MouseButton::Left,
                pressed: true,
            }
        );
    }

    #[test]
    fn key_descriptors() {
        let press = InputEvent::KeyPress { key: Key::Char('a') };
        assert_eq!(
            serde_json::to_value(&press).unwrap(),
            json!({"event_type": "key_press", "data": {"key": {"type": "char", "value": "a"}}})
        );

        let release: InputEvent = serde_json::from_value(json!({
            "event_type": "key_release",
            "data": {"key": {"type": "special", "value": "shift"}}
        }))
        .unwrap();
        assert_eq!(
            release,
            InputEvent::KeyRelease {
                key: Key::Special("shift".to_string())
            }
        );
    }

    #[test]
    fn classification() {
        let scroll = InputEvent::MouseScroll {
            x: 0,
            y: 0,
            dx: 0,
            dy: -3,
        };
        assert!(scroll.is_mouse());
        assert!(!scroll.is_keyboard());
        assert_eq!(scroll.event_type(), "mouse_scroll");

        let key = InputEvent::KeyPress {
            key: Key::Special("enter".to_string()),
        };
        assert!(key.is_keyboard());
        assert_eq!(key.event_type(), "key_press");
    }

    #[test]
    fn unknown_event_type_rejected() {
        let result: Result<InputEvent, _> =
            serde_json::from_value(json!({"event_type": "joystick", "data": {}}));
        assert!(result.is_err());
    }
}
