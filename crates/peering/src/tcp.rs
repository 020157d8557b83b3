//! Tokio TCP implementation of the [`Transport`] seam.
//!
//! Sessions exchange a single hello line (`VIGIL/1 <node_id>`) in both
//! directions right after connect; completing it is what advances a peer
//! from connected to peered. The session is then held open and drained
//! until EOF or error, which surfaces as a connection loss.

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use crate::events::ErrorCode;
use crate::transport::{ConnToken, Transport, TransportEvent};

const HELLO_MAGIC: &str = "VIGIL/1";

type SessionKey = (IpAddr, u16);

/// Live session tasks keyed by remote endpoint. Each task removes its own
/// entry when it ends; the id guards a finished task against clearing a
/// newer session that reused its key.
#[derive(Debug, Default)]
struct Sessions {
    next_id: AtomicU64,
    map: Mutex<HashMap<SessionKey, (u64, AbortHandle)>>,
}

impl Sessions {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, key: SessionKey, id: u64, handle: AbortHandle) {
        if let Some((_, old)) = self.map.lock().insert(key, (id, handle)) {
            old.abort();
        }
    }

    /// Called by a session task as its last action.
    fn finish(&self, key: SessionKey, id: u64) {
        let mut map = self.map.lock();
        if map.get(&key).is_some_and(|(live, _)| *live == id) {
            map.remove(&key);
        }
    }

    fn remove(&self, key: &SessionKey) -> Option<AbortHandle> {
        self.map.lock().remove(key).map(|(_, handle)| handle)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.lock().len()
    }
}

/// TCP transport. One instance per local node; outbound attempts and
/// accepted sessions each run on their own task.
pub struct TcpTransport {
    node_id: String,
    events: mpsc::Sender<TransportEvent>,
    sessions: Arc<Sessions>,
    listener: Mutex<Option<AbortHandle>>,
}

impl TcpTransport {
    /// Creates the transport together with the event channel the peer
    /// manager's pump consumes.
    pub fn channel(
        node_id: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let transport = Arc::new(Self {
            node_id: node_id.into(),
            events: tx,
            sessions: Arc::new(Sessions::default()),
            listener: Mutex::new(None),
        });
        (transport, rx)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn start_listening(&self, addr: IpAddr, port: u16) -> io::Result<u16> {
        // One listener at a time; a re-listen replaces the previous one.
        if let Some(old) = self.listener.lock().take() {
            old.abort();
        }

        let listener = TcpListener::bind((addr, port)).await?;
        let bound = listener.local_addr()?.port();
        debug!(%addr, port = bound, "listener bound");

        let events = self.events.clone();
        let node_id = self.node_id.clone();
        let sessions = Arc::clone(&self.sessions);
        let accept_loop = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        let events = events.clone();
                        let node_id = node_id.clone();
                        let key = (remote.ip(), remote.port());
                        let id = sessions.next_id();
                        let task_sessions = Arc::clone(&sessions);
                        let handle = tokio::spawn(async move {
                            inbound_session(stream, key.0, key.1, node_id, events).await;
                            task_sessions.finish(key, id);
                        });
                        sessions.register(key, id, handle.abort_handle());
                    }
                    Err(err) => {
                        warn!(error = %err, "listener accept failed");
                        let _ = events
                            .send(TransportEvent::Fault {
                                code: ErrorCode::TransportError,
                                message: format!("accept failed: {err}"),
                            })
                            .await;
                    }
                }
            }
        });
        *self.listener.lock() = Some(accept_loop.abort_handle());

        Ok(bound)
    }

    async fn begin_connect(&self, token: ConnToken) {
        let events = self.events.clone();
        let node_id = self.node_id.clone();
        let key = (token.addr, token.port);
        let id = self.sessions.next_id();
        let sessions = Arc::clone(&self.sessions);
        let handle = tokio::spawn(async move {
            outbound_session(token, node_id, events).await;
            sessions.finish(key, id);
        });
        self.sessions.register(key, id, handle.abort_handle());
    }

    async fn close(&self, token: ConnToken) {
        if let Some(handle) = self.sessions.remove(&(token.addr, token.port)) {
            trace!(addr = %token.addr, port = token.port, "closing session");
            handle.abort();
        }
    }
}

async fn outbound_session(token: ConnToken, local_id: String, events: mpsc::Sender<TransportEvent>) {
    let stream = match TcpStream::connect((token.addr, token.port)).await {
        Ok(stream) => stream,
        Err(err) => {
            let _ = events
                .send(TransportEvent::ConnectFailed {
                    token,
                    reason: err.to_string(),
                })
                .await;
            return;
        }
    };

    let _ = events.send(TransportEvent::ConnectOk { token }).await;

    match hello(stream, &local_id).await {
        Ok((remote_id, mut reader, _write)) => {
            let _ = events
                .send(TransportEvent::HandshakeDone {
                    token,
                    node_id: remote_id,
                })
                .await;
            let reason = drain(&mut reader).await;
            let _ = events
                .send(TransportEvent::ConnectionLost { token, reason })
                .await;
        }
        Err(err) => {
            let _ = events
                .send(TransportEvent::Fault {
                    code: ErrorCode::PeerIncompatible,
                    message: format!("hello with {}:{} failed: {err}", token.addr, token.port),
                })
                .await;
            let _ = events
                .send(TransportEvent::ConnectionLost {
                    token,
                    reason: err.to_string(),
                })
                .await;
        }
    }
}

async fn inbound_session(
    stream: TcpStream,
    addr: IpAddr,
    port: u16,
    local_id: String,
    events: mpsc::Sender<TransportEvent>,
) {
    // Inbound sessions have no manager-issued epoch.
    let token = ConnToken {
        addr,
        port,
        epoch: 0,
    };

    match hello(stream, &local_id).await {
        Ok((remote_id, mut reader, _write)) => {
            let _ = events
                .send(TransportEvent::InboundPeered {
                    addr,
                    port,
                    node_id: remote_id,
                })
                .await;
            let reason = drain(&mut reader).await;
            let _ = events
                .send(TransportEvent::ConnectionLost { token, reason })
                .await;
        }
        Err(err) => {
            let _ = events
                .send(TransportEvent::Fault {
                    code: ErrorCode::PeerIncompatible,
                    message: format!("inbound hello from {addr}:{port} failed: {err}"),
                })
                .await;
        }
    }
}

/// Sends our hello line and reads the peer's. Returns the remote node id
/// plus both stream halves; the write half must be kept alive for the
/// session's lifetime.
async fn hello(
    stream: TcpStream,
    local_id: &str,
) -> io::Result<(String, BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let (read, mut write) = stream.into_split();

    write
        .write_all(format!("{HELLO_MAGIC} {local_id}\n").as_bytes())
        .await?;
    write.flush().await?;

    let mut reader = BufReader::new(read);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "peer closed during hello",
        ));
    }

    let remote_id = line
        .trim_end()
        .strip_prefix(HELLO_MAGIC)
        .and_then(|rest| rest.strip_prefix(' '))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognized hello"))?;

    Ok((remote_id.to_owned(), reader, write))
}

/// Holds a session open until EOF or error; the return value is the loss
/// reason.
async fn drain(reader: &mut BufReader<OwnedReadHalf>) -> String {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => return "connection closed by peer".to_string(),
            Ok(_) => continue,
            Err(err) => return err.to_string(),
        }
    }
}
