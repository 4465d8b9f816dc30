//! Daemon configuration loaded from TOML.

use std::time::Duration;

use peripheral_share_types::{Position, ScreenGeometry};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Daemon network and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// A peer silent for longer than this is disconnected.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            log_level: default_log_level(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            connect_timeout_secs: default_connect_timeout(),
            ping_interval_secs: default_ping_interval(),
            idle_timeout_secs: default_idle_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

impl DaemonConfig {
    /// Geometry of the local primary screen.
    pub fn screen(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.screen_width, self.screen_height)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Machine identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

/// Input subsystem settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_true")]
    pub mouse_enabled: bool,
    #[serde(default = "default_true")]
    pub keyboard_enabled: bool,
    /// Distance in pixels from a screen edge that counts as touching it.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: u32,
    /// Also hand off through the top and bottom edges.
    #[serde(default)]
    pub vertical_edges: bool,
    /// Multiplier applied to injected pointer coordinates.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_enabled: true,
            keyboard_enabled: true,
            edge_threshold: default_edge_threshold(),
            vertical_edges: false,
            sensitivity: default_sensitivity(),
        }
    }
}

/// Where this machine and its peers sit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Slot of the local machine.
    #[serde(default = "default_position")]
    pub position: Position,
    /// Known peers by hostname. Unlisted peers take the first free slot.
    #[serde(default)]
    pub devices: Vec<LayoutDevice>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            position: default_position(),
            devices: Vec::new(),
        }
    }
}

impl LayoutConfig {
    /// Configured slot for a peer hostname.
    pub fn position_of(&self, hostname: &str) -> Option<Position> {
        self.devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(hostname))
            .map(|d| d.position)
    }
}

/// A peer pinned to a layout slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutDevice {
    pub name: String,
    pub position: Position,
}

fn default_port() -> u16 {
    8888
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "peripheral-share".to_string())
}

fn default_screen_width() -> u32 {
    1920
}

fn default_screen_height() -> u32 {
    1080
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ping_interval() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    5
}

fn default_edge_threshold() -> u32 {
    5
}

fn default_sensitivity() -> f64 {
    1.0
}

fn default_position() -> Position {
    Position::Middle
}
