//! WebSocket transport and the coordinator event loop
//!
//! Each accepted socket gets a reader and a writer task; everything they
//! observe funnels through one event channel into the coordinator loop,
//! which owns the `MessageRouter` (and with it all session state). That
//! loop processes events to completion one at a time, so room and
//! presence mutation is never interleaved and needs no locks.

use crate::connection::ConnectionId;
use crate::router::MessageRouter;
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Events sent from transport tasks to the coordinator loop.
#[derive(Debug)]
pub enum ServerEvent {
    Opened {
        sender: mpsc::UnboundedSender<Message>,
        reply: oneshot::Sender<ConnectionId>,
    },
    Inbound {
        conn_id: ConnectionId,
        text: String,
    },
    /// Any non-text frame; counts as a heartbeat acknowledgement.
    Acknowledged {
        conn_id: ConnectionId,
    },
    Closed {
        conn_id: ConnectionId,
    },
}

/// The session server: accept loop, per-connection tasks and the
/// coordinator loop around a `MessageRouter`.
pub struct Server {
    listener: TcpListener,
    router: MessageRouter,
    heartbeat_interval: Duration,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(
        addr: &str,
        router: MessageRouter,
        heartbeat_interval: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            router,
            heartbeat_interval,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Runs the accept loop and the coordinator loop until the process is
    /// stopped.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let accept_tx = self.event_tx.clone();
        let listener = self.listener;

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        tokio::spawn(handle_socket(stream, addr, accept_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });

        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        // The first tick fires immediately; skip it so connections get a
        // full interval before their first probe.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(ServerEvent::Opened { sender, reply }) => {
                        let conn_id = self.router.session_mut().open_connection(sender);
                        let _ = reply.send(conn_id);
                    }
                    Some(ServerEvent::Inbound { conn_id, text }) => {
                        self.router.session_mut().mark_alive(conn_id);
                        self.router.handle(conn_id, &text).await;
                    }
                    Some(ServerEvent::Acknowledged { conn_id }) => {
                        self.router.session_mut().mark_alive(conn_id);
                    }
                    Some(ServerEvent::Closed { conn_id }) => {
                        let outcome = self.router.session_mut().close_connection(conn_id);
                        self.router.session().broadcast_disconnect(&outcome);
                    }
                    None => {
                        info!("Event channel closed, shutting down");
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    for outcome in self.router.session_mut().sweep_heartbeats() {
                        self.router.session().broadcast_disconnect(&outcome);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Per-connection transport plumbing: upgrade, register through the
/// coordinator, then pump frames both ways until either side goes away.
async fn handle_socket(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    info!("WebSocket connection from {}", addr);

    let (mut sink, mut source) = ws.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
    let (reply_tx, reply_rx) = oneshot::channel();

    if events
        .send(ServerEvent::Opened {
            sender,
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }
    let Ok(conn_id) = reply_rx.await else {
        return;
    };

    // Writer: drains the outbound queue. A queued close frame, or the
    // registry dropping the sender, ends the task and shuts the socket.
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let closing = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: forwards frames to the coordinator. Any frame counts as a
    // liveness acknowledgement.
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if events
                    .send(ServerEvent::Inbound {
                        conn_id,
                        text: text.to_string(),
                    })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                let _ = events.send(ServerEvent::Acknowledged { conn_id });
            }
            Err(e) => {
                warn!("Connection {} transport error: {}", conn_id, e);
                break;
            }
        }
    }

    let _ = events.send(ServerEvent::Closed { conn_id });
    writer.abort();
}
