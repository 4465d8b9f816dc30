//! Bookkeeping for connected peers.
//!
//! A hub holds any number of sessions; a spoke holds at most one. Both expose
//! the same send surface so the daemon loop does not care which it is.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use peripheral_share_protocol::{PeerId, Session};
use peripheral_share_types::{DeviceInfo, Envelope, Position};
use tracing::{debug, warn};

use crate::error::RegistryError;

/// How this daemon joined the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Listens and accepts many peers.
    Hub,
    /// Connects out to a single hub.
    Spoke,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hub => write!(f, "hub"),
            Self::Spoke => write!(f, "spoke"),
        }
    }
}

/// One registered peer.
#[derive(Debug)]
pub struct PeerEntry {
    pub session: Session,
    /// Last `device_info` the peer sent.
    pub device_info: Option<DeviceInfo>,
    /// Whether the peer currently holds the active role.
    pub active: bool,
    pub position: Option<Position>,
    pub last_seen: Instant,
}

/// Sessions keyed by peer id.
#[derive(Debug)]
pub struct PeerRegistry {
    role: Role,
    peers: HashMap<PeerId, PeerEntry>,
}

impl PeerRegistry {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            peers: HashMap::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn register(&mut self, session: Session) -> Result<(), RegistryError> {
        let id = session.peer_id().clone();
        if self.peers.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        if self.role == Role::Spoke {
            if let Some(existing) = self.peers.keys().next() {
                return Err(RegistryError::SpokeOccupied(existing.clone()));
            }
        }

        debug!(peer = %id, role = %self.role, "peer registered");
        self.peers.insert(
            id,
            PeerEntry {
                session,
                device_info: None,
                active: false,
                position: None,
                last_seen: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn unregister(&mut self, id: &PeerId) -> Option<PeerEntry> {
        let entry = self.peers.remove(id);
        if entry.is_some() {
            debug!(peer = %id, "peer unregistered");
        }
        entry
    }

    pub fn get(&self, id: &PeerId) -> Option<&PeerEntry> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &PeerEntry)> {
        self.peers.iter()
    }

    /// Record inbound traffic from a peer.
    pub fn touch(&mut self, id: &PeerId) {
        if let Some(entry) = self.peers.get_mut(id) {
            entry.last_seen = Instant::now();
        }
    }

    /// Store a peer's `device_info`, replacing any earlier one.
    pub fn set_device_info(&mut self, id: &PeerId, info: DeviceInfo) -> Result<(), RegistryError> {
        let entry = self
            .peers
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownPeer(id.clone()))?;
        entry.device_info = Some(info);
        Ok(())
    }

    pub fn set_position(&mut self, id: &PeerId, position: Position) -> Result<(), RegistryError> {
        let entry = self
            .peers
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownPeer(id.clone()))?;
        entry.position = Some(position);
        Ok(())
    }

    /// Flag `active` on the given peer and clear it everywhere else.
    pub fn mark_active(&mut self, active: Option<&PeerId>) {
        for (id, entry) in &mut self.peers {
            entry.active = Some(id) == active;
        }
    }

    /// Peers that have been silent for longer than `timeout`.
    pub fn stale(&self, timeout: Duration) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|(_, entry)| entry.last_seen.elapsed() > timeout)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Send to one peer. A failed peer is unregistered.
    pub fn send_to(&mut self, id: &PeerId, envelope: &Envelope) -> Result<(), RegistryError> {
        let session = self
            .peers
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| RegistryError::UnknownPeer(id.clone()))?;

        if let Err(source) = session.send(envelope) {
            self.unregister(id);
            return Err(RegistryError::Send {
                peer: id.clone(),
                source,
            });
        }
        Ok(())
    }

    /// Send to every peer, best effort.
    ///
    /// Peers whose send fails are unregistered and returned; the rest still
    /// receive the envelope.
    pub fn broadcast(&mut self, envelope: &Envelope) -> Vec<PeerId> {
        let sessions: Vec<Session> = self.peers.values().map(|e| e.session.clone()).collect();
        let mut failed = Vec::new();
        for session in sessions {
            if let Err(e) = session.send(envelope) {
                warn!(peer = %session.peer_id(), error = %e, kind = envelope.kind(), "broadcast send failed");
                failed.push(session.peer_id().clone());
            }
        }
        for id in &failed {
            self.unregister(id);
        }
        failed
    }

    /// Send local input onward: to every peer on a hub, to the single
    /// session on a spoke. Returns the peers that failed.
    pub fn forward(&mut self, envelope: &Envelope) -> Vec<PeerId> {
        match self.role {
            Role::Hub => self.broadcast(envelope),
            Role::Spoke => {
                let Some(id) = self.peers.keys().next().cloned() else {
                    return Vec::new();
                };
                match self.send_to(&id, envelope) {
                    Ok(()) => Vec::new(),
                    Err(e) => {
                        warn!(error = %e, "forward failed");
                        vec![id]
                    }
                }
            }
        }
    }

    /// Close every session and forget all peers.
    pub fn close_all(&mut self, reason: peripheral_share_protocol::CloseReason) {
        for (_, entry) in self.peers.drain() {
            entry.session.close(reason.clone());
        }
    }
}
