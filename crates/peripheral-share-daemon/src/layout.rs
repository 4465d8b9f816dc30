//! Which device sits in which slot.
//!
//! The layout is a row of three slots (`left`, `middle`, `right`). The local
//! machine always occupies one; peers fill the others once their
//! `device_info` arrives.

use std::net::SocketAddr;

use peripheral_share_protocol::PeerId;
use peripheral_share_types::{Position, ScreenEdge, ScreenGeometry};

use crate::error::LayoutError;

/// Identifies a device in the layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKey {
    Local,
    Peer(PeerId),
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Peer(id) => write!(f, "{id}"),
        }
    }
}

/// A placed device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub key: DeviceKey,
    pub position: Position,
    pub screen: ScreenGeometry,
    pub address: Option<SocketAddr>,
    pub connected: bool,
}

#[derive(Debug, Default)]
pub struct DeviceLayout {
    entries: Vec<LayoutEntry>,
}

impl DeviceLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a device. Re-adding a known device moves or resizes it.
    ///
    /// Local devices start connected; peers start disconnected until
    /// [`mark_connected`](Self::mark_connected).
    pub fn add_device(
        &mut self,
        key: DeviceKey,
        position: Position,
        width: u32,
        height: u32,
        address: Option<SocketAddr>,
    ) -> Result<(), LayoutError> {
        if let Some(occupant) = self
            .entries
            .iter()
            .find(|e| e.position == position && e.key != key)
        {
            return Err(LayoutError::SlotOccupied {
                position,
                occupant: occupant.key.to_string(),
            });
        }

        let connected = match self.entries.iter().position(|e| e.key == key) {
            Some(index) => self.entries.remove(index).connected,
            None => key == DeviceKey::Local,
        };
        self.entries.push(LayoutEntry {
            key,
            position,
            screen: ScreenGeometry::new(width, height),
            address,
            connected,
        });
        Ok(())
    }

    pub fn remove_device(&mut self, key: &DeviceKey) -> Option<LayoutEntry> {
        let index = self.entries.iter().position(|e| &e.key == key)?;
        Some(self.entries.remove(index))
    }

    pub fn mark_connected(&mut self, key: &DeviceKey, connected: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.key == key) {
            entry.connected = connected;
        }
    }

    pub fn get(&self, key: &DeviceKey) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn at(&self, position: Position) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.position == position)
    }

    /// The connected device reached by leaving `current` through `direction`.
    pub fn get_adjacent(&self, current: &DeviceKey, direction: ScreenEdge) -> Option<&LayoutEntry> {
        let here = self.get(current)?.position;
        let there = here.neighbor(direction)?;
        self.at(there).filter(|e| e.connected)
    }

    /// First empty slot, preferring the ones next to `near`.
    pub fn first_free_slot(&self, near: Position) -> Option<Position> {
        let neighbors = [ScreenEdge::Left, ScreenEdge::Right]
            .into_iter()
            .filter_map(|edge| near.neighbor(edge));
        neighbors
            .chain(Position::ALL)
            .find(|&slot| self.at(slot).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.iter()
    }
}
