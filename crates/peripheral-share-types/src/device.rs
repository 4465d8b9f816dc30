//! Device descriptor types.

use serde::{Deserialize, Serialize};

use crate::screen::ScreenGeometry;

/// Describes a machine and its displays. Exchanged once per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub hostname: String,
    /// Operating system name (e.g. "linux", "windows", "macos").
    pub platform: String,
    #[serde(default)]
    pub screen_count: usize,
    pub screens: Vec<ScreenInfo>,
}

impl DeviceInfo {
    #[must_use]
    pub fn new(
        hostname: impl Into<String>,
        platform: impl Into<String>,
        screens: Vec<ScreenInfo>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            platform: platform.into(),
            screen_count: screens.len(),
            screens,
        }
    }

    /// Geometry of the first advertised screen.
    #[must_use]
    pub fn primary_screen(&self) -> Option<ScreenGeometry> {
        self.screens.first().map(ScreenInfo::geometry)
    }
}

/// One display of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub name: String,
}

impl ScreenInfo {
    #[must_use]
    pub fn from_geometry(geometry: ScreenGeometry, name: impl Into<String>) -> Self {
        Self {
            width: geometry.width,
            height: geometry.height,
            x: geometry.x,
            y: geometry.y,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn geometry(&self) -> ScreenGeometry {
        ScreenGeometry {
            width: self.width,
            height: self.height,
            x: self.x,
            y: self.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_counts_screens() {
        let info = DeviceInfo::new(
            "desk",
            "linux",
            vec![
                ScreenInfo::from_geometry(ScreenGeometry::new(1920, 1080), "primary"),
                ScreenInfo::from_geometry(
                    ScreenGeometry {
                        width: 1280,
                        height: 1024,
                        x: 1920,
                        y: 0,
                    },
                    "side",
                ),
            ],
        );
        assert_eq!(info.screen_count, 2);
        assert_eq!(info.primary_screen(), Some(ScreenGeometry::new(1920, 1080)));
    }

    #[test]
    fn device_info_without_screens() {
        let info = DeviceInfo::new("headless", "linux", Vec::new());
        assert_eq!(info.screen_count, 0);
        assert!(info.primary_screen().is_none());
    }

    #[test]
    fn screen_defaults_offsets() {
        let screen: ScreenInfo = serde_json::from_str(r#"{"width": 800, "height": 600}"#).unwrap();
        assert_eq!(screen.geometry(), ScreenGeometry::new(800, 600));
        assert!(screen.name.is_empty());
    }
}
