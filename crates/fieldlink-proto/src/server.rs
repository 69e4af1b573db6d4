//! DS/FMS listener service.
//!
//! Binds the TCP control port and the UDP status port, decodes everything
//! that arrives, and fans the decoded messages out through a
//! [`tokio::sync::broadcast`] channel. Per-connection decode failures are
//! logged and never tear down the service.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ds::{FrameReassembler, decode_udp_status};
use crate::error::ProtoError;
use crate::{DEFAULT_FMS_ADDRESS, DS_TCP_PORT, DS_UDP_RECV_PORT};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const TCP_READ_BUFFER: usize = 4096;
const MAX_UDP_DATAGRAM: usize = 1500;

/// Where the listener binds.
#[derive(Debug, Clone)]
pub struct FmsServerConfig {
    pub address: IpAddr,
    pub tcp_port: u16,
    pub udp_port: u16,
}

impl Default for FmsServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_FMS_ADDRESS.parse().expect("default FMS address is valid"),
            tcp_port: DS_TCP_PORT,
            udp_port: DS_UDP_RECV_PORT,
        }
    }
}

/// One decoded inbound event, tagged with its origin.
#[derive(Debug, Clone)]
pub enum FmsEvent {
    /// Message from the DS TCP control stream.
    Tcp {
        peer: SocketAddr,
        message: crate::ds::DsMessage,
    },
    /// Status datagram from the DS UDP port.
    Udp {
        peer: SocketAddr,
        status: crate::ds::UdpStatus,
    },
}

/// Handle to the running listener.
///
/// Both socket loops are bound before [`start`](Self::start) returns, so a
/// bind failure surfaces immediately rather than inside a background task.
pub struct FmsServer {
    event_tx: broadcast::Sender<Arc<FmsEvent>>,
    cancel: CancellationToken,
}

impl FmsServer {
    /// Bind the TCP and UDP ports and spawn the listener tasks.
    pub async fn start(
        config: FmsServerConfig,
        cancel: CancellationToken,
    ) -> Result<Self, ProtoError> {
        let tcp_addr = SocketAddr::new(config.address, config.tcp_port);
        let udp_addr = SocketAddr::new(config.address, config.udp_port);

        let tcp_listener = TcpListener::bind(tcp_addr).await?;
        let udp_socket = UdpSocket::bind(udp_addr).await?;
        info!(%tcp_addr, %udp_addr, "FMS listener bound");

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let tx = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            accept_loop(tcp_listener, tx, task_cancel).await;
        });

        let tx = event_tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            udp_loop(udp_socket, tx, task_cancel).await;
        });

        Ok(Self { event_tx, cancel })
    }

    /// Get a new receiver for the decoded event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FmsEvent>> {
        self.event_tx.subscribe()
    }

    /// Signal the listener tasks to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── TCP side ─────────────────────────────────────────────────────────

async fn accept_loop(
    listener: TcpListener,
    event_tx: broadcast::Sender<Arc<FmsEvent>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "DS connected");
                        let tx = event_tx.clone();
                        let conn_cancel = cancel.clone();
                        tokio::spawn(async move {
                            connection_loop(stream, peer, tx, conn_cancel).await;
                            info!(%peer, "DS disconnected");
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
    debug!("FMS TCP accept loop exiting");
}

/// Read one DS connection until it closes, reassembling frames across
/// arbitrary chunk boundaries.
async fn connection_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    event_tx: broadcast::Sender<Arc<FmsEvent>>,
    cancel: CancellationToken,
) {
    let mut reassembler = FrameReassembler::new();
    let mut buf = vec![0u8; TCP_READ_BUFFER];

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = stream.read(&mut buf) => {
                let n = match read {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) => {
                        warn!(%peer, error = %e, "DS socket error");
                        break;
                    }
                };

                for result in reassembler.push(&buf[..n]) {
                    match result {
                        Ok(message) => {
                            debug!(%peer, ?message, "DS message");
                            let _ = event_tx.send(Arc::new(FmsEvent::Tcp { peer, message }));
                        }
                        // Fatal to this message only, the stream continues.
                        Err(e) => warn!(%peer, error = %e, "bad DS frame"),
                    }
                }
            }
        }
    }
}

// ── UDP side ─────────────────────────────────────────────────────────

async fn udp_loop(
    socket: UdpSocket,
    event_tx: broadcast::Sender<Arc<FmsEvent>>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_UDP_DATAGRAM];

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => {
                let (n, peer) = match received {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "UDP recv failed");
                        continue;
                    }
                };

                match decode_udp_status(&buf[..n]) {
                    Ok(status) => {
                        let _ = event_tx.send(Arc::new(FmsEvent::Udp { peer, status }));
                    }
                    Err(e) => warn!(%peer, error = %e, "bad DS status datagram"),
                }
            }
        }
    }
    debug!("FMS UDP loop exiting");
}

// ── Tests ────────────────────────────────────────────────────────────
