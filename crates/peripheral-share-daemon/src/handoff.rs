//! The handoff state machine.
//!
//! Pure transition logic: every handler takes the current state plus one
//! observation and returns the side effects the daemon loop must perform.
//! Nothing here touches sockets or input backends.

use peripheral_share_protocol::PeerId;
use peripheral_share_types::{Envelope, InputEvent, Point, ScreenEdge, ScreenGeometry};
use tracing::{debug, info};

use crate::config::InputConfig;
use crate::registry::Role;

/// Whether this device currently owns the shared keyboard and mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffState {
    /// Not started yet.
    #[default]
    Idle,
    /// Local input is captured and forwarded.
    Active,
    /// Remote input is injected locally.
    Passive,
}

impl std::fmt::Display for HandoffState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active => write!(f, "active"),
            Self::Passive => write!(f, "passive"),
        }
    }
}

/// A side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffAction {
    SendHandoff {
        peer: PeerId,
        edge: ScreenEdge,
        entry: Point,
    },
    StartCapture,
    StopCapture,
    WarpCursor(Point),
    /// Send a local event onward (broadcast on a hub, direct on a spoke).
    Forward(InputEvent),
    Inject(InputEvent),
    Reply {
        peer: PeerId,
        envelope: Envelope,
    },
}

/// Neighbor chosen for an outgoing handoff.
#[derive(Debug, Clone)]
pub struct HandoffTarget {
    pub peer: PeerId,
    pub screen: ScreenGeometry,
}

#[derive(Debug)]
pub struct HandoffMachine {
    state: HandoffState,
    /// While passive: the peer we handed control to, if known.
    current_device: Option<PeerId>,
    capturing: bool,
    screen: ScreenGeometry,
    input: InputConfig,
}

impl HandoffMachine {
    pub fn new(screen: ScreenGeometry, input: InputConfig) -> Self {
        Self {
            state: HandoffState::Idle,
            current_device: None,
            capturing: false,
            screen,
            input,
        }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HandoffState::Active
    }

    pub fn current_device(&self) -> Option<&PeerId> {
        self.current_device.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Leave `Idle`. The listening hub starts active, a connecting spoke
    /// starts passive.
    pub fn start(&mut self, role: Role) -> Vec<HandoffAction> {
        match role {
            Role::Hub => self.become_active(),
            Role::Spoke => {
                self.state = HandoffState::Passive;
                Vec::new()
            }
        }
    }

    /// The local pointer touched `edge` at `from`.
    ///
    /// `target` is the connected neighbor across that edge, if any. Without
    /// one nothing happens.
    pub fn on_edge(
        &mut self,
        edge: ScreenEdge,
        from: Point,
        target: Option<HandoffTarget>,
    ) -> Vec<HandoffAction> {
        if !self.is_active() {
            return Vec::new();
        }
        let Some(target) = target else {
            debug!(%edge, "no connected neighbor across edge");
            return Vec::new();
        };

        let entry = target.screen.entry_point(&self.screen, edge, from);
        info!(peer = %target.peer, %edge, x = entry.x, y = entry.y, "handing off");

        self.state = HandoffState::Passive;
        self.current_device = Some(target.peer.clone());
        let mut actions = vec![HandoffAction::SendHandoff {
            peer: target.peer,
            edge,
            entry,
        }];
        actions.extend(self.stop_capture());
        actions
    }

    /// A peer handed control to us.
    pub fn on_handoff(
        &mut self,
        from: &PeerId,
        edge: ScreenEdge,
        entry: Option<Point>,
    ) -> Vec<HandoffAction> {
        if self.state != HandoffState::Passive {
            debug!(peer = %from, state = %self.state, "ignoring handoff");
            return Vec::new();
        }

        let entry = entry.map_or_else(
            || self.screen.entry_point(&self.screen, edge, self.screen.center()),
            |point| self.screen.clamp(point),
        );
        info!(peer = %from, %edge, x = entry.x, y = entry.y, "received handoff");

        let mut actions = self.stop_capture();
        actions.extend(self.become_active());
        actions.push(HandoffAction::WarpCursor(entry));
        actions
    }

    /// An event from the local capture backend.
    pub fn on_local_input(&mut self, event: InputEvent) -> Vec<HandoffAction> {
        if !self.is_active() {
            return Vec::new();
        }
        if (event.is_mouse() && !self.input.mouse_enabled)
            || (event.is_keyboard() && !self.input.keyboard_enabled)
        {
            return Vec::new();
        }
        vec![HandoffAction::Forward(event)]
    }

    /// An `input` envelope from a peer.
    pub fn on_remote_input(&mut self, from: &PeerId, event: InputEvent) -> Vec<HandoffAction> {
        if self.state != HandoffState::Passive {
            debug!(peer = %from, event_type = event.event_type(), "ignoring input while not passive");
            return Vec::new();
        }
        vec![HandoffAction::Inject(scale_event(
            event,
            self.input.sensitivity,
            &self.screen,
        ))]
    }

    pub fn on_ping(&mut self, from: &PeerId, timestamp: u64) -> Vec<HandoffAction> {
        vec![HandoffAction::Reply {
            peer: from.clone(),
            envelope: Envelope::Pong { timestamp },
        }]
    }

    /// A session ended. `remaining` is the number of peers still connected.
    ///
    /// A passive device takes control back when it loses the device it
    /// handed off to, or when it has nobody left.
    pub fn on_peer_closed(&mut self, peer: &PeerId, remaining: usize) -> Vec<HandoffAction> {
        if self.state != HandoffState::Passive {
            return Vec::new();
        }
        let lost_current = self.current_device.as_ref() == Some(peer);
        if !lost_current && remaining > 0 {
            return Vec::new();
        }
        info!(peer = %peer, remaining, "regaining control after disconnect");
        self.become_active()
    }

    fn become_active(&mut self) -> Vec<HandoffAction> {
        self.state = HandoffState::Active;
        self.current_device = None;
        self.capturing = true;
        vec![HandoffAction::StartCapture]
    }

    fn stop_capture(&mut self) -> Vec<HandoffAction> {
        if std::mem::take(&mut self.capturing) {
            vec![HandoffAction::StopCapture]
        } else {
            Vec::new()
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scale(value: i32, factor: f64) -> i32 {
    (f64::from(value) * factor).round() as i32
}

/// Scale a pointer move, keeping the result on `screen`.
fn scale_event(event: InputEvent, factor: f64, screen: &ScreenGeometry) -> InputEvent {
    if (factor - 1.0).abs() < f64::EPSILON {
        return event;
    }
    match event {
        InputEvent::MouseMove { x, y } => {
            let Point { x, y } = screen.clamp(Point::new(scale(x, factor), scale(y, factor)));
            InputEvent::MouseMove { x, y }
        }
        other => other,
    }
}
