//! Screen geometry, edges and layout positions.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distance in pixels from the entry edge at which a handed-off cursor lands.
pub const ENTRY_MARGIN: i32 = 10;

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen geometry for a machine's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// X offset for multi-monitor setups.
    pub x: i32,
    /// Y offset for multi-monitor setups.
    pub y: i32,
}

impl ScreenGeometry {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
        }
    }

    /// Rightmost pixel column.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x
            .saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
            .saturating_sub(1)
            .max(self.x)
    }

    /// Bottom pixel row.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y
            .saturating_add(i32::try_from(self.height).unwrap_or(i32::MAX))
            .saturating_sub(1)
            .max(self.y)
    }

    /// Distance in pixels between a coordinate and the given edge.
    ///
    /// Negative when the coordinate lies beyond the edge.
    #[must_use]
    pub fn distance_to_edge(&self, px: i32, py: i32, edge: ScreenEdge) -> i64 {
        match edge {
            ScreenEdge::Left => i64::from(px) - i64::from(self.x),
            ScreenEdge::Right => i64::from(self.right()) - i64::from(px),
            ScreenEdge::Top => i64::from(py) - i64::from(self.y),
            ScreenEdge::Bottom => i64::from(self.bottom()) - i64::from(py),
        }
    }

    /// Clamp a point into this screen.
    #[must_use]
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(self.x, self.right()),
            y: point.y.clamp(self.y, self.bottom()),
        }
    }

    /// The screen centre.
    #[must_use]
    pub fn center(&self) -> Point {
        Point {
            x: self.x + i32::try_from(self.width / 2).unwrap_or(0),
            y: self.y + i32::try_from(self.height / 2).unwrap_or(0),
        }
    }

    /// Where the cursor enters this screen after leaving `source` through
    /// `leaving` at `from`.
    ///
    /// The crossing edge is mirrored (leaving left enters near the right
    /// boundary, and so on) and the coordinate along the edge is mapped
    /// proportionally between the two screens.
    #[must_use]
    pub fn entry_point(&self, source: &ScreenGeometry, leaving: ScreenEdge, from: Point) -> Point {
        let width = i32::try_from(self.width).unwrap_or(i32::MAX);
        let height = i32::try_from(self.height).unwrap_or(i32::MAX);
        let target = match leaving {
            ScreenEdge::Left => Point {
                x: self.x.saturating_add(width).saturating_sub(ENTRY_MARGIN),
                y: scale(from.y, source.y, source.height, self.y, self.height),
            },
            ScreenEdge::Right => Point {
                x: self.x.saturating_add(ENTRY_MARGIN),
                y: scale(from.y, source.y, source.height, self.y, self.height),
            },
            ScreenEdge::Top => Point {
                x: scale(from.x, source.x, source.width, self.x, self.width),
                y: self.y.saturating_add(height).saturating_sub(ENTRY_MARGIN),
            },
            ScreenEdge::Bottom => Point {
                x: scale(from.x, source.x, source.width, self.x, self.width),
                y: self.y.saturating_add(ENTRY_MARGIN),
            },
        };
        self.clamp(target)
    }
}

fn scale(value: i32, from_origin: i32, from_len: u32, to_origin: i32, to_len: u32) -> i32 {
    let offset = i64::from(value) - i64::from(from_origin);
    let scaled = offset * i64::from(to_len) / i64::from(from_len.max(1));
    i32::try_from(i64::from(to_origin) + scaled).unwrap_or(if scaled < 0 {
        i32::MIN
    } else {
        i32::MAX
    })
}

/// Which edge of the screen the cursor is crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl ScreenEdge {
    /// Return the opposite edge.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

impl std::fmt::Display for ScreenEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

/// A named slot in the device layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Left,
    Middle,
    Right,
}

impl Position {
    /// Every slot, ordered left to right.
    pub const ALL: [Position; 3] = [Position::Left, Position::Middle, Position::Right];

    /// The slot reached by leaving this one through `edge`.
    #[must_use]
    pub fn neighbor(self, edge: ScreenEdge) -> Option<Self> {
        match (self, edge) {
            (Self::Middle, ScreenEdge::Left) => Some(Self::Left),
            (Self::Middle, ScreenEdge::Right) => Some(Self::Right),
            (Self::Right, ScreenEdge::Left) | (Self::Left, ScreenEdge::Right) => Some(Self::Middle),
            _ => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Middle => write!(f, "middle"),
            Self::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layout position: {0:?}")]
pub struct ParsePositionError(pub String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "middle" | "center" => Ok(Self::Middle),
            "right" => Ok(Self::Right),
            _ => Err(ParsePositionError(s.to_string())),
        }
    }
}
