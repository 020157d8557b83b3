//! Peer manager: local identity, listening endpoint, and the peer table.
//!
//! `peer`/`unpeer` only enqueue work on the transport and return; every
//! outcome is observed through the event emitter, driven by the single
//! event-pump task so per-peer event ordering matches transition order.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use vigil_values::Port;

use crate::endpoint::{EndpointInfo, NetworkInfo, PeerInfo};
use crate::error::PeeringError;
use crate::events::{ErrorCode, EventEmitter, PeeringEvent};
use crate::status::PeerStatus;
use crate::transport::{ConnToken, Transport, TransportEvent};

type PeerKey = (IpAddr, u16);

#[derive(Debug, Clone)]
pub struct PeerManagerConfig {
    /// Local node identity. Generated when absent; stable for the process
    /// lifetime either way.
    pub node_id: Option<String>,
    /// Broadcast channel capacity for peering events.
    pub event_channel_capacity: usize,
    /// Floor applied to caller-supplied retry intervals.
    pub min_retry: Duration,
}

impl Default for PeerManagerConfig {
    fn default() -> Self {
        Self {
            node_id: None,
            event_channel_capacity: 256,
            min_retry: Duration::from_secs(1),
        }
    }
}

fn generate_node_id() -> String {
    // 48 bits of randomness renders as exactly twelve hex digits.
    format!("vigil-{:012x}", rand::random::<u64>() >> 16)
}

/// One tracked peer. Status and epoch are atomics so snapshots and
/// staleness checks never contend with the event pump.
#[derive(Debug)]
struct PeerEntry {
    addr: IpAddr,
    port: u16,
    status: AtomicU8,
    /// Bumped on every explicit peer/unpeer; stale transport events and
    /// cancelled retries are recognized by comparing against it.
    epoch: AtomicU64,
    retry: RwLock<Option<Duration>>,
    remote_id: RwLock<Option<String>>,
}

impl PeerEntry {
    fn new(addr: IpAddr, port: u16) -> Self {
        Self {
            addr,
            port,
            status: AtomicU8::new(PeerStatus::Initializing as u8),
            epoch: AtomicU64::new(0),
            retry: RwLock::new(None),
            remote_id: RwLock::new(None),
        }
    }

    fn status(&self) -> PeerStatus {
        PeerStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    fn set_status(&self, status: PeerStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    fn endpoint(&self) -> EndpointInfo {
        EndpointInfo {
            node_id: self.remote_id.read().clone().unwrap_or_default(),
            network: Some(NetworkInfo {
                address: self.addr,
                port: self.port,
            }),
        }
    }

    fn info(&self) -> PeerInfo {
        PeerInfo {
            endpoint: self.endpoint(),
            status: self.status(),
        }
    }
}

/// Owns the local node identity, the listening endpoint, and the
/// authoritative peer table.
pub struct PeerManager<T: Transport> {
    config: PeerManagerConfig,
    node_id: String,
    transport: Arc<T>,
    peers: RwLock<HashMap<PeerKey, Arc<PeerEntry>>>,
    events: EventEmitter,
    listen_port: Mutex<Option<u16>>,
}

impl<T: Transport> PeerManager<T> {
    pub fn new(config: PeerManagerConfig, transport: Arc<T>) -> Self {
        let node_id = config.node_id.clone().unwrap_or_else(generate_node_id);
        Self {
            events: EventEmitter::new(config.event_channel_capacity),
            config,
            node_id,
            transport,
            peers: RwLock::new(HashMap::new()),
            listen_port: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PeerManagerConfig {
        &self.config
    }

    /// Local node identity, stable for the process lifetime.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeeringEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn listen_port(&self) -> Option<u16> {
        *self.listen_port.lock()
    }

    /// Snapshot of the peer table. Insertion order is not guaranteed; a
    /// fresh call re-enumerates.
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.peers.read().values().map(|entry| entry.info()).collect()
    }

    /// Binds the listening endpoint and returns the bound port. Fails with
    /// `InvalidTransport` before any bind if the port is not stream-capable.
    pub async fn listen(&self, addr: IpAddr, port: Port) -> Result<u16, PeeringError> {
        if !port.is_tcp() {
            return Err(PeeringError::InvalidTransport(port));
        }

        let bound = self.transport.start_listening(addr, port.number).await?;
        *self.listen_port.lock() = Some(bound);

        info!(%addr, port = bound, "listening for peers");
        self.events
            .status(EndpointInfo::new(self.node_id.clone(), addr, bound), "listening");
        Ok(bound)
    }

    /// Registers an outbound peering attempt. Returns immediately;
    /// completion is observed via status events. A zero `retry` disables
    /// reconnection, anything else is floored at the configured minimum.
    /// Calling this for an endpoint that is already connecting or connected
    /// keeps the session and only replaces the retry interval.
    pub async fn peer(
        &self,
        addr: IpAddr,
        port: Port,
        retry: Duration,
    ) -> Result<(), PeeringError> {
        if !port.is_tcp() {
            return Err(PeeringError::InvalidTransport(port));
        }

        let key = (addr, port.number);
        let (entry, added) = {
            let mut peers = self.peers.write();
            match peers.get(&key) {
                Some(entry) => (Arc::clone(entry), false),
                None => {
                    let entry = Arc::new(PeerEntry::new(addr, port.number));
                    peers.insert(key, Arc::clone(&entry));
                    (entry, true)
                }
            }
        };

        *entry.retry.write() =
            (retry > Duration::ZERO).then(|| retry.max(self.config.min_retry));

        // Re-peering an active endpoint only replaces its retry interval.
        if !added && entry.status().is_active() {
            trace!(%addr, port = port.number, "already peering, retry interval updated");
            return Ok(());
        }

        if added {
            debug!(%addr, port = port.number, "peer added");
            self.events.peer_added(entry.endpoint(), "peer added");
        }

        let epoch = entry.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        if entry.status() == PeerStatus::Disconnected {
            self.transition(&entry, PeerStatus::Reconnecting);
        }
        self.transition(&entry, PeerStatus::Connecting);
        self.transport
            .begin_connect(ConnToken {
                addr,
                port: port.number,
                epoch,
            })
            .await;
        Ok(())
    }

    /// Cancels any pending retry and tears down an established session.
    /// Idempotent: unpeering an unknown endpoint succeeds.
    pub async fn unpeer(&self, addr: IpAddr, port: Port) -> Result<(), PeeringError> {
        if !port.is_tcp() {
            return Err(PeeringError::InvalidTransport(port));
        }

        let key = (addr, port.number);
        let Some(entry) = self.peers.write().remove(&key) else {
            trace!(%addr, port = port.number, "unpeer for unknown endpoint");
            return Ok(());
        };

        // Cancellation wins over any in-flight retry.
        let epoch = entry.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.transport
            .close(ConnToken {
                addr,
                port: port.number,
                epoch,
            })
            .await;

        if entry.status().is_active() {
            self.transition(&entry, PeerStatus::Disconnected);
        }
        debug!(%addr, port = port.number, "peer removed");
        self.events.peer_removed(entry.endpoint(), "peer removed");
        Ok(())
    }

    /// Starts the event pump consuming transport events. One task: all
    /// state-machine driving and event emission is serialized through it.
    pub fn spawn(self: Arc<Self>, mut events: mpsc::Receiver<TransportEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(event).await;
            }
            trace!("transport event channel closed, event pump stopping");
        })
    }

    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::ConnectOk { token } => {
                if let Some(entry) = self.fresh(&token) {
                    self.transition(&entry, PeerStatus::Connected);
                }
            }
            TransportEvent::HandshakeDone { token, node_id } => {
                if let Some(entry) = self.fresh(&token) {
                    *entry.remote_id.write() = Some(node_id);
                    self.transition(&entry, PeerStatus::Peered);
                }
            }
            TransportEvent::ConnectFailed { token, reason } => {
                if let Some(entry) = self.fresh(&token) {
                    self.transition(&entry, PeerStatus::Disconnected);
                    self.events.error(
                        ErrorCode::PeerUnavailable,
                        format!("cannot connect to {}:{}: {reason}", token.addr, token.port),
                    );
                    self.schedule_retry(entry, token).await;
                }
            }
            TransportEvent::ConnectionLost { token, reason } => {
                if let Some(entry) = self.fresh(&token) {
                    let established =
                        matches!(entry.status(), PeerStatus::Connected | PeerStatus::Peered);
                    self.transition(&entry, PeerStatus::Disconnected);
                    if established {
                        self.events.peer_lost(entry.endpoint(), reason);
                    }
                    self.schedule_retry(entry, token).await;
                }
            }
            TransportEvent::InboundPeered {
                addr,
                port,
                node_id,
            } => {
                let key = (addr, port);
                let (entry, added) = {
                    let mut peers = self.peers.write();
                    match peers.get(&key) {
                        Some(entry) => (Arc::clone(entry), false),
                        None => {
                            let entry = Arc::new(PeerEntry::new(addr, port));
                            peers.insert(key, Arc::clone(&entry));
                            (entry, true)
                        }
                    }
                };
                if added {
                    debug!(%addr, port, remote = %node_id, "inbound peer accepted");
                    self.events.peer_added(entry.endpoint(), "peer added");
                }
                *entry.remote_id.write() = Some(node_id);
                self.transition(&entry, PeerStatus::Connecting);
                self.transition(&entry, PeerStatus::Connected);
                self.transition(&entry, PeerStatus::Peered);
            }
            TransportEvent::Fault { code, message } => {
                self.events.error(code, message);
            }
        }
    }

    /// Resolves the entry for a token, dropping events whose epoch was
    /// superseded by a later peer/unpeer.
    fn fresh(&self, token: &ConnToken) -> Option<Arc<PeerEntry>> {
        let entry = self
            .peers
            .read()
            .get(&(token.addr, token.port))
            .map(Arc::clone)?;
        if entry.epoch.load(Ordering::Acquire) != token.epoch {
            trace!(addr = %token.addr, port = token.port, "stale transport event dropped");
            return None;
        }
        Some(entry)
    }

    fn transition(&self, entry: &PeerEntry, next: PeerStatus) {
        let old = entry.status();
        if old == next {
            return;
        }
        if !old.can_advance_to(next) {
            debug_assert!(false, "invalid peering transition {old} -> {next}");
            return;
        }
        entry.set_status(next);
        trace!(addr = %entry.addr, port = entry.port, %old, %next, "peer status changed");
        self.events.status(entry.endpoint(), next.to_string());
    }

    /// After a loss: re-enter the retry loop if an interval is configured,
    /// otherwise the record is terminal and gets pruned.
    async fn schedule_retry(self: &Arc<Self>, entry: Arc<PeerEntry>, token: ConnToken) {
        let Some(delay) = *entry.retry.read() else {
            self.transport.close(token).await;
            self.peers.write().remove(&(token.addr, token.port));
            self.events
                .peer_removed(entry.endpoint(), "no retry configured, dropping peer");
            return;
        };

        self.transition(&entry, PeerStatus::Reconnecting);
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A newer epoch means peer/unpeer superseded this attempt.
            if entry.epoch.load(Ordering::Acquire) != token.epoch {
                trace!(addr = %token.addr, port = token.port, "retry cancelled");
                return;
            }
            manager.transition(&entry, PeerStatus::Connecting);
            manager.transport.begin_connect(token).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicBool;

    use assert_matches::assert_matches;

    use super::*;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    const SCRIPTED_BOUND_PORT: u16 = 47000;

    /// Scripted transport: records calls, answers every connect attempt
    /// with either a refusal or a full connect+hello sequence.
    struct ScriptedTransport {
        tx: mpsc::Sender<TransportEvent>,
        refuse: AtomicBool,
        binds: Mutex<Vec<(IpAddr, u16)>>,
        attempts: Mutex<Vec<ConnToken>>,
        closes: Mutex<Vec<ConnToken>>,
    }

    impl ScriptedTransport {
        fn channel() -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
            let (tx, rx) = mpsc::channel(64);
            let transport = Arc::new(Self {
                tx,
                refuse: AtomicBool::new(false),
                binds: Mutex::new(Vec::new()),
                attempts: Mutex::new(Vec::new()),
                closes: Mutex::new(Vec::new()),
            });
            (transport, rx)
        }

        fn refuse_connects(&self) {
            self.refuse.store(true, Ordering::Relaxed);
        }

        async fn inject(&self, event: TransportEvent) {
            self.tx.send(event).await.unwrap();
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn start_listening(&self, addr: IpAddr, port: u16) -> std::io::Result<u16> {
            self.binds.lock().push((addr, port));
            Ok(if port == 0 { SCRIPTED_BOUND_PORT } else { port })
        }

        async fn begin_connect(&self, token: ConnToken) {
            self.attempts.lock().push(token);
            if self.refuse.load(Ordering::Relaxed) {
                let _ = self
                    .tx
                    .send(TransportEvent::ConnectFailed {
                        token,
                        reason: "connection refused".into(),
                    })
                    .await;
            } else {
                let _ = self.tx.send(TransportEvent::ConnectOk { token }).await;
                let _ = self
                    .tx
                    .send(TransportEvent::HandshakeDone {
                        token,
                        node_id: "remote-node".into(),
                    })
                    .await;
            }
        }

        async fn close(&self, token: ConnToken) {
            self.closes.lock().push(token);
        }
    }

    fn manager_with(transport: Arc<ScriptedTransport>) -> Arc<PeerManager<ScriptedTransport>> {
        Arc::new(PeerManager::new(
            PeerManagerConfig {
                node_id: Some("local-node".into()),
                min_retry: Duration::from_millis(10),
                ..Default::default()
            },
            transport,
        ))
    }

    async fn next_event(rx: &mut broadcast::Receiver<PeeringEvent>) -> PeeringEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a peering event")
            .expect("event channel closed")
    }

    /// Drains events until a `Status` with the given message arrives.
    async fn wait_for_status(rx: &mut broadcast::Receiver<PeeringEvent>, wanted: &str) {
        loop {
            if let PeeringEvent::Status { message, .. } = next_event(rx).await
                && message == wanted
            {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_listen_rejects_non_stream_port_without_binding() {
        let (transport, _rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));

        let err = manager
            .listen(LOCALHOST, Port::udp(9999))
            .await
            .unwrap_err();
        assert_matches!(err, PeeringError::InvalidTransport(_));
        assert!(transport.binds.lock().is_empty());
        assert_eq!(manager.listen_port(), None);
    }

    #[tokio::test]
    async fn test_listen_returns_bound_port_and_reports_status() {
        let (transport, _rx) = ScriptedTransport::channel();
        let manager = manager_with(transport);
        let mut events = manager.subscribe();

        let bound = manager.listen(LOCALHOST, Port::tcp(0)).await.unwrap();
        assert_eq!(bound, SCRIPTED_BOUND_PORT);
        assert_eq!(manager.listen_port(), Some(bound));

        match next_event(&mut events).await {
            PeeringEvent::Status { endpoint, message } => {
                assert_eq!(message, "listening");
                assert_eq!(endpoint.node_id, "local-node");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_peering_walks_the_state_machine() {
        let (transport, rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::ZERO)
            .await
            .unwrap();

        assert_matches!(next_event(&mut events).await, PeeringEvent::PeerAdded { .. });
        for expected in ["connecting", "connected", "peered"] {
            match next_event(&mut events).await {
                PeeringEvent::Status { message, .. } => assert_eq!(message, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }

        let peers = manager.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].status, PeerStatus::Peered);
        assert_eq!(peers[0].endpoint.node_id, "remote-node");
    }

    #[tokio::test]
    async fn test_peer_rejects_non_stream_port() {
        let (transport, _rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));

        let err = manager
            .peer(LOCALHOST, Port::udp(7075), Duration::ZERO)
            .await
            .unwrap_err();
        assert_matches!(err, PeeringError::InvalidTransport(_));
        assert!(transport.attempts.lock().is_empty());
        assert!(manager.peers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_peer_loops_through_reconnecting() {
        let (transport, rx) = ScriptedTransport::channel();
        transport.refuse_connects();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::from_millis(50))
            .await
            .unwrap();

        // First cycle: connecting, then the refusal surfaces.
        wait_for_status(&mut events, "connecting").await;
        wait_for_status(&mut events, "disconnected").await;
        wait_for_status(&mut events, "reconnecting").await;
        // The retry loop re-enters connecting.
        wait_for_status(&mut events, "connecting").await;

        assert!(transport.attempts.lock().len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_surfaces_peer_unavailable_error() {
        let (transport, rx) = ScriptedTransport::channel();
        transport.refuse_connects();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::ZERO)
            .await
            .unwrap();

        loop {
            if let PeeringEvent::Error { code, message } = next_event(&mut events).await {
                assert_eq!(code, ErrorCode::PeerUnavailable);
                assert!(message.contains("connection refused"));
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_without_retry_is_pruned_after_failure() {
        let (transport, rx) = ScriptedTransport::channel();
        transport.refuse_connects();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::ZERO)
            .await
            .unwrap();

        loop {
            if let PeeringEvent::PeerRemoved { .. } = next_event(&mut events).await {
                break;
            }
        }
        assert!(manager.peers().is_empty());
        // Pruning also releases the transport-side session.
        assert_eq!(transport.closes.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_repeering_an_active_endpoint_updates_the_retry_interval() {
        let (transport, rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::from_secs(5))
            .await
            .unwrap();
        wait_for_status(&mut events, "peered").await;

        // Still active: no new connection attempt, but the retry interval
        // changes to "disabled".
        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(transport.attempts.lock().len(), 1);

        transport
            .inject(TransportEvent::ConnectionLost {
                token: ConnToken {
                    addr: LOCALHOST,
                    port: 7075,
                    epoch: 1,
                },
                reason: "connection reset".into(),
            })
            .await;

        // The loss now prunes the peer instead of entering the reconnect
        // loop.
        loop {
            match next_event(&mut events).await {
                PeeringEvent::PeerRemoved { .. } => break,
                PeeringEvent::Status { message, .. } => assert_ne!(message, "reconnecting"),
                _ => continue,
            }
        }
        assert!(manager.peers().is_empty());
        assert_eq!(transport.attempts.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unpeer_during_reconnecting_cancels_the_retry() {
        let (transport, rx) = ScriptedTransport::channel();
        transport.refuse_connects();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        manager
            .peer(LOCALHOST, Port::tcp(7075), Duration::from_secs(3600))
            .await
            .unwrap();
        wait_for_status(&mut events, "reconnecting").await;

        manager.unpeer(LOCALHOST, Port::tcp(7075)).await.unwrap();
        assert!(manager.peers().is_empty());

        // Drain up to the removal notification...
        loop {
            if let PeeringEvent::PeerRemoved { .. } = next_event(&mut events).await {
                break;
            }
        }
        // ...after which the peer must stay silent: no retry fires after
        // cancellation.
        let quiet = tokio::time::timeout(Duration::from_secs(7200), events.recv()).await;
        assert!(quiet.is_err(), "unexpected event after unpeer: {quiet:?}");
    }

    #[tokio::test]
    async fn test_unpeer_is_idempotent() {
        let (transport, _rx) = ScriptedTransport::channel();
        let manager = manager_with(transport);

        manager.unpeer(LOCALHOST, Port::tcp(7075)).await.unwrap();
        manager.unpeer(LOCALHOST, Port::tcp(7075)).await.unwrap();

        assert_matches!(
            manager.unpeer(LOCALHOST, Port::udp(7075)).await,
            Err(PeeringError::InvalidTransport(_))
        );
    }

    #[tokio::test]
    async fn test_inbound_peer_enters_and_leaves_the_table() {
        let (transport, rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        transport
            .inject(TransportEvent::InboundPeered {
                addr: LOCALHOST,
                port: 51123,
                node_id: "visitor".into(),
            })
            .await;

        wait_for_status(&mut events, "peered").await;
        let peers = manager.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].endpoint.node_id, "visitor");

        // Inbound sessions carry epoch 0 and have no retry: losing one
        // prunes the record.
        transport
            .inject(TransportEvent::ConnectionLost {
                token: ConnToken {
                    addr: LOCALHOST,
                    port: 51123,
                    epoch: 0,
                },
                reason: "connection closed by peer".into(),
            })
            .await;

        loop {
            match next_event(&mut events).await {
                PeeringEvent::PeerLost { endpoint, .. } => {
                    assert_eq!(endpoint.node_id, "visitor");
                    break;
                }
                PeeringEvent::Status { .. } => continue,
                other => panic!("unexpected event: {other:?}"),
            }
        }
        loop {
            if let PeeringEvent::PeerRemoved { .. } = next_event(&mut events).await {
                break;
            }
        }
        assert!(manager.peers().is_empty());
    }

    #[tokio::test]
    async fn test_node_id_is_stable_and_configurable() {
        let (transport, _rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));
        assert_eq!(manager.node_id(), "local-node");
        assert_eq!(manager.node_id(), manager.node_id());

        let generated = PeerManager::new(PeerManagerConfig::default(), transport);
        assert!(generated.node_id().starts_with("vigil-"));
        assert_eq!(generated.node_id().len(), "vigil-".len() + 12);
    }

    #[tokio::test]
    async fn test_fault_events_are_forwarded_with_their_code() {
        let (transport, rx) = ScriptedTransport::channel();
        let manager = manager_with(Arc::clone(&transport));
        let mut events = manager.subscribe();
        let _pump = Arc::clone(&manager).spawn(rx);

        transport
            .inject(TransportEvent::Fault {
                code: ErrorCode::TransportError,
                message: "accept failed: too many open files".into(),
            })
            .await;

        match next_event(&mut events).await {
            PeeringEvent::Error { code, .. } => assert_eq!(code, ErrorCode::TransportError),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
