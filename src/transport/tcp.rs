//! # TCP Transport
//!
//! Serves quiz clients over TCP using [`ServerCodec`] framing, and opens
//! client connections using [`ClientCodec`].
//!
//! Every decoded client packet goes through a [`ServerDispatcher`]; the
//! packets a handler returns are written back in order. Handler failures are
//! reported with an `Error` packet and the connection stays open. A decode
//! failure ends the framed stream, so the peer gets a `Disconnect` packet
//! and the connection is closed.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProtocolConfig;
use crate::core::codec::{ClientCodec, ServerCodec};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dispatcher::ServerDispatcher;
use crate::protocol::packets::{DisconnectPacket, ErrorPacket, PacketSet, ServerPacket};
use crate::utils::metrics::global_metrics;

/// A server-side connection
pub type ServerConnection = Framed<TcpStream, ServerCodec>;

/// A client-side connection
pub type ClientConnection = Framed<TcpStream, ClientCodec>;

const SERVER_FULL: &str = "Server is full";

/// Bind the configured address and serve until CTRL+C
pub async fn start_server(config: ProtocolConfig, dispatcher: ServerDispatcher) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    // Held until serve returns
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx_clone.send(()).await;
            }
            Err(e) => error!(error = %e, "Failed to listen for CTRL+C"),
        }
    });

    let listener = TcpListener::bind(&config.server.address).await?;
    let result = serve(listener, config, dispatcher, shutdown_rx).await;
    drop(shutdown_tx);
    result
}

/// Serve connections from `listener` until `shutdown_rx` fires
#[instrument(skip_all, fields(address = ?listener.local_addr().ok()))]
pub async fn serve(
    listener: TcpListener,
    config: ProtocolConfig,
    dispatcher: ServerDispatcher,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    info!("Listening for quiz clients");

    let active = Arc::new(AtomicUsize::new(0));
    let (close_tx, close_rx) = watch::channel(false);

    loop {
        tokio::select! {
            Some(()) = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");
                let _ = close_tx.send(true);
                wait_for_connections(&active, config.server.shutdown_timeout).await;
                global_metrics().log_metrics();
                return Ok(());
            }

            accept_result = listener.accept() => {
                let (stream, peer) = match accept_result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        global_metrics().connection_error();
                        error!(error = %e, "Error accepting connection");
                        continue;
                    }
                };

                let codec = ServerCodec::from_config(&config.limits);
                let mut framed = Framed::new(stream, codec);

                if active.load(Ordering::Acquire) >= config.server.max_connections {
                    warn!(peer = %peer, "Rejecting connection, server is full");
                    tokio::spawn(async move {
                        let _ = framed
                            .send(ServerPacket::from(DisconnectPacket::new(SERVER_FULL)))
                            .await;
                    });
                    continue;
                }

                let guard = ConnectionGuard::new(Arc::clone(&active));
                let dispatcher = dispatcher.clone();
                let close_rx = close_rx.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    if let Err(e) = handle_connection(&mut framed, peer, &dispatcher, close_rx).await {
                        global_metrics().connection_error();
                        debug!(peer = %peer, error = %e, "Connection ended with error");
                    }
                });
            }
        }
    }
}

/// Open a client connection to a quiz server
pub async fn connect(addr: &str) -> Result<ClientConnection> {
    connect_with_config(addr, &ProtocolConfig::default()).await
}

pub async fn connect_with_config(addr: &str, config: &ProtocolConfig) -> Result<ClientConnection> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    debug!(address = %addr, "Connected to quiz server");
    Ok(Framed::new(stream, ClientCodec::from_config(&config.limits)))
}

async fn handle_connection(
    framed: &mut ServerConnection,
    peer: SocketAddr,
    dispatcher: &ServerDispatcher,
    mut close_rx: watch::Receiver<bool>,
) -> Result<()> {
    debug!(peer = %peer, "Client connected");

    loop {
        tokio::select! {
            _ = close_rx.changed() => {
                framed
                    .send(ServerPacket::from(DisconnectPacket::new(constants::ERR_SHUTDOWN)))
                    .await?;
                return Ok(());
            }

            frame = framed.next() => match frame {
                None => {
                    debug!(peer = %peer, "Client disconnected");
                    return Ok(());
                }
                Some(Ok(packet)) => {
                    debug!(peer = %peer, packet = packet.name(), "Received packet");
                    match dispatcher.dispatch(&packet) {
                        Ok(replies) => send_all(framed, replies).await?,
                        Err(e) => {
                            global_metrics().dispatch_error();
                            warn!(peer = %peer, packet = packet.name(), error = %e, "Handler failed");
                            framed.send(ServerPacket::from(ErrorPacket::from(&e))).await?;
                        }
                    }
                }
                Some(Err(ProtocolError::Io(e))) => return Err(ProtocolError::Io(e)),
                Some(Err(e)) => {
                    warn!(peer = %peer, error = %e, "Malformed packet, disconnecting");
                    framed
                        .send(ServerPacket::from(DisconnectPacket::new(e.to_string())))
                        .await?;
                    return Err(e);
                }
            }
        }
    }
}

async fn send_all(framed: &mut ServerConnection, packets: Vec<ServerPacket>) -> Result<()> {
    let mut replies = futures::stream::iter(packets.into_iter().map(Ok::<_, ProtocolError>));
    framed.send_all(&mut replies).await
}

async fn wait_for_connections(active: &AtomicUsize, timeout: Duration) {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        let connections = active.load(Ordering::Acquire);
        if connections == 0 {
            info!("All connections closed, shutting down");
            return;
        }

        tokio::select! {
            _ = &mut deadline => {
                warn!(connections, "Shutdown timeout reached, forcing exit");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                debug!(connections, "Waiting for connections to close");
            }
        }
    }
}

/// Tracks one live connection in both the local count and global metrics
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        global_metrics().connection_established();
        Self { active }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        global_metrics().connection_closed();
    }
}
