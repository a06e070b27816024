use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::TransportError;
use super::packet::{endpoint_url, Handshake, Packet};
use super::{SendOutcome, Transport, UPDATE_LOCATION_EVENT};
use crate::config::ServerConfig;
use crate::telemetry::LocationReport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

const OUTBOX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            initial: config.reconnect_delay,
            max: config.reconnect_delay_max.max(config.reconnect_delay),
        }
    }

    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

#[derive(Debug)]
struct WorkerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Long-lived Socket.IO client. Created once per process; reconnects on its
/// own until [`SocketClient::shutdown`] is called.
pub struct SocketClient {
    outbox: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
    worker: StdMutex<Option<WorkerHandle>>,
}

impl SocketClient {
    pub fn spawn(config: &ServerConfig) -> Result<Self, TransportError> {
        let url = endpoint_url(&config.url)?;
        let policy = ReconnectPolicy::from_config(config);
        let connect_timeout = config.connect_timeout;
        let connected = Arc::new(AtomicBool::new(false));
        let (outbox, outbox_rx) = mpsc::channel(OUTBOX_DEPTH);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        log::info!("Connecting to {}", url);
        let join = tokio::spawn(run_connection_loop(
            url,
            policy,
            connect_timeout,
            connected.clone(),
            outbox_rx,
            shutdown_rx,
        ));

        Ok(Self {
            outbox,
            connected,
            worker: StdMutex::new(Some(WorkerHandle { shutdown_tx, join })),
        })
    }

    /// Leaves the namespace, closes the socket and stops reconnecting.
    pub async fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            let _ = worker.shutdown_tx.send(());
            let _ = worker.join.await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Transport for SocketClient {
    fn send(&self, report: &LocationReport) -> SendOutcome {
        if !self.is_connected() {
            log::debug!("Not connected, dropping report for {}", report.operator_id());
            return SendOutcome::Dropped;
        }

        let frame = match Packet::event(UPDATE_LOCATION_EVENT, report).and_then(|p| p.encode()) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to encode report: {}", e);
                return SendOutcome::Dropped;
            }
        };

        match self.outbox.try_send(frame) {
            Ok(()) => {
                log::debug!("Location sent: {:?}", report);
                SendOutcome::Queued
            }
            Err(e) => {
                log::warn!("Dropping report, socket writer unavailable: {}", e);
                SendOutcome::Dropped
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn run_connection_loop(
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    connected: Arc<AtomicBool>,
    mut outbox_rx: mpsc::Receiver<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut delay = policy.initial;

    loop {
        let mut established = false;
        let result = run_session(
            &url,
            connect_timeout,
            &connected,
            &mut outbox_rx,
            &mut shutdown_rx,
            &mut established,
        )
        .await;
        connected.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                log::info!("Disconnected from server");
                return;
            }
            Err(e) if established => {
                log::warn!("Disconnected: {}", e);
                delay = policy.initial;
            }
            Err(e) => log::warn!("Connection attempt failed: {}", e),
        }

        // Frames queued just before the link dropped are not replayed.
        while outbox_rx.try_recv().is_ok() {}

        log::info!("Reconnecting in {:?}", delay);
        tokio::select! {
            _ = sleep(delay) => {}
            _ = &mut shutdown_rx => return,
        }
        delay = policy.next(delay);
    }
}

/// Returns `Ok` only on a requested shutdown; any error means reconnect.
async fn run_session(
    url: &str,
    connect_timeout: Duration,
    connected: &AtomicBool,
    outbox_rx: &mut mpsc::Receiver<String>,
    shutdown_rx: &mut oneshot::Receiver<()>,
    established: &mut bool,
) -> Result<(), TransportError> {
    let (ws, _) = tokio::select! {
        res = timeout(connect_timeout, connect_async(url)) => {
            res.map_err(|_| TransportError::Handshake("connect timed out".into()))??
        }
        _ = &mut *shutdown_rx => return Ok(()),
    };
    let (mut write, mut read) = ws.split();

    let handshake = tokio::select! {
        res = timeout(connect_timeout, join_namespace(&mut write, &mut read)) => {
            res.map_err(|_| TransportError::Handshake("timed out".into()))??
        }
        _ = &mut *shutdown_rx => return Ok(()),
    };

    *established = true;
    connected.store(true, Ordering::SeqCst);
    log::info!("Connected to server (sid {})", handshake.sid);

    let window = handshake.liveness_window();
    let mut deadline = Instant::now() + window;

    loop {
        tokio::select! {
            msg = read.next() => {
                let msg = match msg {
                    Some(msg) => msg?,
                    None => return Err(TransportError::Closed),
                };
                match msg {
                    Message::Text(text) => {
                        deadline = Instant::now() + window;
                        match Packet::parse(&text) {
                            Ok(Packet::Ping) => {
                                write.send(Message::Text(Packet::Pong.encode()?)).await?;
                            }
                            Ok(Packet::Close) | Ok(Packet::Disconnect) => {
                                return Err(TransportError::Closed);
                            }
                            Ok(Packet::Event { name, .. }) => {
                                log::debug!("Ignoring inbound event {}", name);
                            }
                            Ok(_) => {}
                            Err(e) => log::warn!("Unparseable frame {:?}: {}", text, e),
                        }
                    }
                    Message::Close(_) => return Err(TransportError::Closed),
                    _ => {}
                }
            }
            frame = outbox_rx.recv() => {
                match frame {
                    Some(frame) => write.send(Message::Text(frame)).await?,
                    None => {
                        close(&mut write).await;
                        return Ok(());
                    }
                }
            }
            _ = sleep_until(deadline) => return Err(TransportError::PingTimeout(window)),
            _ = &mut *shutdown_rx => {
                close(&mut write).await;
                return Ok(());
            }
        }
    }
}

async fn join_namespace(write: &mut WsWrite, read: &mut WsRead) -> Result<Handshake, TransportError> {
    let handshake = match read_packet(read).await? {
        Packet::Open(handshake) => handshake,
        other => {
            return Err(TransportError::Handshake(format!(
                "expected open packet, got {:?}",
                other
            )))
        }
    };

    write.send(Message::Text(Packet::Connect(None).encode()?)).await?;

    loop {
        match read_packet(read).await? {
            Packet::Connect(_) => return Ok(handshake),
            Packet::ConnectError(data) => return Err(TransportError::Handshake(data.to_string())),
            Packet::Ping => write.send(Message::Text(Packet::Pong.encode()?)).await?,
            Packet::Close => return Err(TransportError::Closed),
            _ => {}
        }
    }
}

async fn read_packet(read: &mut WsRead) -> Result<Packet, TransportError> {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => return Packet::parse(&text),
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

async fn close(write: &mut WsWrite) {
    if let Ok(frame) = Packet::Disconnect.encode() {
        let _ = write.send(Message::Text(frame)).await;
    }
    let _ = write.send(Message::Close(None)).await;
}
