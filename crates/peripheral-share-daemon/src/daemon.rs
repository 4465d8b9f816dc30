//! Core daemon orchestration.
//!
//! One task owns all mutable state: the peer registry, the layout and the
//! handoff machine. Sessions, the capture backend and outside callers reach it
//! only through channels, so every transition is applied in order.

use std::net::SocketAddr;

use peripheral_share_input::{InputCapture, InputInjection};
use peripheral_share_protocol::{
    CloseReason, PeerId, ProtocolError, Session, SessionEvent, TcpTransport,
};
use peripheral_share_types::{
    DeviceInfo, Envelope, InputEvent, Point, Position, ScreenEdge, ScreenInfo,
};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::edge::EdgeDetector;
use crate::error::DaemonError;
use crate::handoff::{HandoffAction, HandoffMachine, HandoffState, HandoffTarget};
use crate::layout::{DeviceKey, DeviceLayout};
use crate::registry::{PeerRegistry, Role};

/// Requests from outside the daemon loop.
#[derive(Debug)]
pub enum DaemonEvent {
    /// Close one peer's session.
    Disconnect(PeerId),
    /// Stop the loop and release all resources.
    Shutdown,
}

/// Snapshot of the daemon for status displays and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaemonStatus {
    pub state: HandoffState,
    /// While passive: the peer control was handed to.
    pub current_device: Option<PeerId>,
    pub capturing: bool,
    pub peers: Vec<PeerStatus>,
}

impl DaemonStatus {
    pub fn peer(&self, id: &PeerId) -> Option<&PeerStatus> {
        self.peers.iter().find(|p| &p.id == id)
    }

    pub fn peer_named(&self, hostname: &str) -> Option<&PeerStatus> {
        self.peers
            .iter()
            .find(|p| p.hostname.as_deref() == Some(hostname))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerStatus {
    pub id: PeerId,
    pub hostname: Option<String>,
    pub position: Option<Position>,
    pub connected: bool,
    pub active: bool,
}

/// The peripheral-share daemon.
pub struct Daemon {
    config: Config,
    role: Role,
    local: DeviceInfo,
    listener: Option<TcpTransport>,
    capture: Box<dyn InputCapture>,
    injection: Box<dyn InputInjection>,
    registry: PeerRegistry,
    layout: DeviceLayout,
    edges: EdgeDetector,
    handoff: HandoffMachine,
    event_tx: mpsc::Sender<DaemonEvent>,
    event_rx: mpsc::Receiver<DaemonEvent>,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    input_tx: mpsc::Sender<InputEvent>,
    input_rx: mpsc::Receiver<InputEvent>,
    status_tx: watch::Sender<DaemonStatus>,
}

impl Daemon {
    /// Create a new daemon instance.
    pub fn new(
        config: Config,
        role: Role,
        capture: Box<dyn InputCapture>,
        injection: Box<dyn InputInjection>,
    ) -> Self {
        let screen = config.daemon.screen();
        let local = DeviceInfo::new(
            config.identity.name.clone(),
            std::env::consts::OS,
            vec![ScreenInfo::from_geometry(screen, "primary")],
        );

        let mut layout = DeviceLayout::new();
        // An empty layout always has room for the local device.
        let _ = layout.add_device(
            DeviceKey::Local,
            config.layout.position,
            screen.width,
            screen.height,
            None,
        );

        let edges = EdgeDetector::new(
            screen,
            config.input.edge_threshold,
            config.input.vertical_edges,
        );
        let handoff = HandoffMachine::new(screen, config.input.clone());

        let (event_tx, event_rx) = mpsc::channel(64);
        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::channel(1024);
        let (status_tx, _) = watch::channel(DaemonStatus::default());

        Self {
            config,
            role,
            local,
            listener: None,
            capture,
            injection,
            registry: PeerRegistry::new(role),
            layout,
            edges,
            handoff,
            event_tx,
            event_rx,
            session_tx,
            session_rx,
            input_tx,
            input_rx,
            status_tx,
        }
    }

    /// Accept inbound peers on `transport` once running.
    pub fn attach_listener(&mut self, transport: TcpTransport) {
        self.listener = Some(transport);
    }

    /// Get a clone of the event sender for feeding events into the daemon.
    pub fn event_sender(&self) -> mpsc::Sender<DaemonEvent> {
        self.event_tx.clone()
    }

    /// Subscribe to status updates.
    pub fn status_receiver(&self) -> watch::Receiver<DaemonStatus> {
        self.status_tx.subscribe()
    }

    /// What this daemon advertises in `device_info`.
    pub fn local_info(&self) -> &DeviceInfo {
        &self.local
    }

    /// Open an outbound session to `addr`.
    ///
    /// Failures are returned to the caller; there is no retry.
    pub async fn connect(&mut self, addr: SocketAddr) -> Result<PeerId, DaemonError> {
        let stream =
            peripheral_share_protocol::connect(addr, self.config.daemon.connect_timeout()).await?;
        let peer = PeerId::from(addr);
        self.open_session(peer.clone(), stream)?;
        info!(peer = %peer, "outbound session established");
        Ok(peer)
    }

    /// Run the daemon event loop until shutdown.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        if let Some(listener) = &self.listener {
            info!(addr = %listener.local_addr()?, role = %self.role, "daemon listening");
        }

        let actions = self.handoff.start(self.role);
        self.apply(actions).await;
        self.publish_status();
        info!(role = %self.role, state = %self.handoff.state(), "daemon running");

        let mut heartbeat = tokio::time::interval(self.config.daemon.ping_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                accepted = accept(self.listener.as_ref()) => {
                    match accepted {
                        Ok((stream, remote)) => self.handle_incoming(stream, remote),
                        Err(e) => debug!(error = %e, "accept error"),
                    }
                }
                event = self.event_rx.recv() => {
                    match event {
                        Some(DaemonEvent::Disconnect(peer)) => {
                            self.close_peer(&peer, CloseReason::Local);
                        }
                        Some(DaemonEvent::Shutdown) | None => {
                            info!("shutting down");
                            break;
                        }
                    }
                }
                Some(event) = self.session_rx.recv() => {
                    self.handle_session_event(event).await;
                }
                Some(event) = self.input_rx.recv() => {
                    self.handle_captured_input(event).await;
                }
                _ = heartbeat.tick() => {
                    self.heartbeat();
                }
            }
            self.publish_status();
        }

        self.shutdown().await
    }

    fn handle_incoming(&mut self, stream: TcpStream, remote: SocketAddr) {
        if self.registry.len() >= self.config.daemon.max_connections {
            warn!(
                remote = %remote,
                max = self.config.daemon.max_connections,
                "connection limit reached, rejecting"
            );
            drop(stream);
            return;
        }
        match self.open_session(PeerId::from(remote), stream) {
            Ok(()) => info!(peer = %remote, "inbound session established"),
            Err(e) => warn!(peer = %remote, error = %e, "failed to set up inbound session"),
        }
    }

    fn open_session(&mut self, peer: PeerId, stream: TcpStream) -> Result<(), DaemonError> {
        let session = Session::open(peer.clone(), stream, self.session_tx.clone());
        if let Err(e) = self.registry.register(session.clone()) {
            session.close(CloseReason::Local);
            return Err(e.into());
        }
        let hello = Envelope::DeviceInfo(self.local.clone());
        self.registry.send_to(&peer, &hello)?;
        Ok(())
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::EnvelopeReceived { peer, envelope } => {
                if !self.registry.contains(&peer) {
                    debug!(peer = %peer, kind = envelope.kind(), "envelope from unregistered peer");
                    return;
                }
                self.registry.touch(&peer);
                let actions = self.handle_envelope(&peer, envelope);
                self.apply(actions).await;
            }
            SessionEvent::Closed { peer, reason } => {
                info!(peer = %peer, %reason, "peer session closed");
                self.forget_peer(&peer);
                let actions = self.handoff.on_peer_closed(&peer, self.registry.len());
                self.apply(actions).await;
            }
        }
    }

    fn handle_envelope(&mut self, peer: &PeerId, envelope: Envelope) -> Vec<HandoffAction> {
        match envelope {
            Envelope::DeviceInfo(info) => {
                self.place_peer(peer, info);
                Vec::new()
            }
            Envelope::Handoff { edge, entry } => {
                self.mirror_peer(peer, edge);
                self.handoff.on_handoff(peer, edge, entry)
            }
            Envelope::Input(event) => self.handoff.on_remote_input(peer, event),
            Envelope::Ping { timestamp } => self.handoff.on_ping(peer, timestamp),
            Envelope::Pong { timestamp } => {
                debug!(peer = %peer, timestamp, "received pong");
                Vec::new()
            }
            Envelope::Unknown => {
                debug!(peer = %peer, "ignoring unknown envelope kind");
                Vec::new()
            }
        }
    }

    /// Record a peer's `device_info` and give it a layout slot.
    fn place_peer(&mut self, peer: &PeerId, info: DeviceInfo) {
        let key = DeviceKey::Peer(peer.clone());
        let screen = info.primary_screen().unwrap_or_else(|| self.config.daemon.screen());
        let hostname = info.hostname.clone();
        debug!(peer = %peer, hostname = %hostname, platform = %info.platform, "device info");

        if let Err(e) = self.registry.set_device_info(peer, info) {
            warn!(error = %e, "device info for unknown peer");
            return;
        }

        let local_position = self.config.layout.position;
        let candidates = [
            self.layout.get(&key).map(|e| e.position),
            self.config.layout.position_of(&hostname),
            self.layout.first_free_slot(local_position),
        ];
        let placed = candidates.into_iter().flatten().find(|&position| {
            self.layout
                .add_device(
                    key.clone(),
                    position,
                    screen.width,
                    screen.height,
                    peer.socket_addr(),
                )
                .is_ok()
        });

        match placed {
            Some(position) => {
                self.layout.mark_connected(&key, true);
                let _ = self.registry.set_position(peer, position);
                info!(peer = %peer, hostname = %hostname, %position, "peer placed");
            }
            None => warn!(peer = %peer, hostname = %hostname, "no free layout slot for peer"),
        }
    }

    /// Move an auto-placed peer to the slot across `edge`, the edge it just
    /// handed off through, so that leaving through the entry side leads
    /// back to it. Peers with a configured slot are left alone.
    fn mirror_peer(&mut self, peer: &PeerId, edge: ScreenEdge) {
        let configured = self
            .registry
            .get(peer)
            .and_then(|entry| entry.device_info.as_ref())
            .and_then(|info| self.config.layout.position_of(&info.hostname));
        if configured.is_some() {
            return;
        }
        let Some(mirrored) = self.config.layout.position.neighbor(edge.opposite()) else {
            return;
        };
        let key = DeviceKey::Peer(peer.clone());
        let Some((current, screen, address)) = self
            .layout
            .get(&key)
            .map(|e| (e.position, e.screen, e.address))
        else {
            return;
        };
        if current == mirrored {
            return;
        }

        match self
            .layout
            .add_device(key, mirrored, screen.width, screen.height, address)
        {
            Ok(()) => {
                let _ = self.registry.set_position(peer, mirrored);
                info!(peer = %peer, from = %current, to = %mirrored, "peer moved to match handoff edge");
            }
            Err(e) => debug!(peer = %peer, error = %e, "cannot move peer to match handoff edge"),
        }
    }

    /// Close a peer's session. Cleanup happens when its `Closed` event
    /// comes back through the loop.
    fn close_peer(&mut self, peer: &PeerId, reason: CloseReason) {
        let session = self.registry.get(peer).map(|entry| entry.session.clone());
        if let Some(session) = session {
            session.close(reason);
        }
    }

    fn forget_peer(&mut self, peer: &PeerId) {
        self.registry.unregister(peer);
        self.layout.remove_device(&DeviceKey::Peer(peer.clone()));
    }

    async fn handle_captured_input(&mut self, event: InputEvent) {
        if !self.handoff.is_active() {
            return;
        }

        if let InputEvent::MouseMove { x, y } = event {
            if let Some(edge) = self.edges.check(x, y) {
                if let Some(target) = self.neighbor(edge) {
                    let actions = self.handoff.on_edge(edge, Point::new(x, y), Some(target));
                    self.apply(actions).await;
                    return;
                }
            }
        }

        let actions = self.handoff.on_local_input(event);
        self.apply(actions).await;
    }

    fn neighbor(&self, edge: ScreenEdge) -> Option<HandoffTarget> {
        let entry = self.layout.get_adjacent(&DeviceKey::Local, edge)?;
        match &entry.key {
            DeviceKey::Peer(peer) => Some(HandoffTarget {
                peer: peer.clone(),
                screen: entry.screen,
            }),
            DeviceKey::Local => None,
        }
    }

    async fn apply(&mut self, actions: Vec<HandoffAction>) {
        for action in actions {
            match action {
                HandoffAction::SendHandoff { peer, edge, entry } => {
                    let envelope = Envelope::Handoff {
                        edge,
                        entry: Some(entry),
                    };
                    if let Err(e) = self.registry.send_to(&peer, &envelope) {
                        warn!(error = %e, "failed to send handoff");
                    }
                }
                HandoffAction::StartCapture => {
                    if let Err(e) = self.capture.start(self.input_tx.clone()).await {
                        warn!(error = %e, "failed to start capture");
                    }
                }
                HandoffAction::StopCapture => {
                    if let Err(e) = self.capture.stop().await {
                        warn!(error = %e, "failed to stop capture");
                    }
                }
                HandoffAction::WarpCursor(point) => {
                    if let Err(e) = self.injection.warp_cursor(point.x, point.y).await {
                        warn!(error = %e, "failed to warp cursor");
                    }
                }
                HandoffAction::Forward(event) => {
                    let failed = self.registry.forward(&Envelope::Input(event));
                    for peer in failed {
                        self.layout.remove_device(&DeviceKey::Peer(peer));
                    }
                }
                HandoffAction::Inject(event) => {
                    if let Err(e) = self.injection.inject(&event).await {
                        warn!(error = %e, event_type = event.event_type(), "failed to inject event");
                    }
                }
                HandoffAction::Reply { peer, envelope } => {
                    if let Err(e) = self.registry.send_to(&peer, &envelope) {
                        debug!(error = %e, "failed to reply");
                    }
                }
            }
        }
        self.registry.mark_active(self.handoff.current_device());
    }

    fn heartbeat(&mut self) {
        for peer in self.registry.stale(self.config.daemon.idle_timeout()) {
            warn!(peer = %peer, "peer idle, closing session");
            self.close_peer(&peer, CloseReason::IdleTimeout);
        }
        if !self.registry.is_empty() {
            let failed = self.registry.broadcast(&Envelope::ping());
            for peer in failed {
                self.layout.remove_device(&DeviceKey::Peer(peer));
            }
        }
    }

    fn status(&self) -> DaemonStatus {
        let mut peers: Vec<PeerStatus> = self
            .registry
            .iter()
            .map(|(id, entry)| PeerStatus {
                id: id.clone(),
                hostname: entry.device_info.as_ref().map(|i| i.hostname.clone()),
                position: entry.position,
                connected: entry.session.is_connected(),
                active: entry.active,
            })
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));

        DaemonStatus {
            state: self.handoff.state(),
            current_device: self.handoff.current_device().cloned(),
            capturing: self.capture.is_capturing(),
            peers,
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_if_modified(|current| {
            let next = self.status();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    async fn shutdown(&mut self) -> Result<(), DaemonError> {
        info!("daemon shutting down");
        self.registry.close_all(CloseReason::Local);
        self.capture.shutdown().await?;
        self.injection.shutdown().await?;
        info!("daemon shut down complete");
        Ok(())
    }
}

async fn accept(
    listener: Option<&TcpTransport>,
) -> Result<(TcpStream, SocketAddr), ProtocolError> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}
