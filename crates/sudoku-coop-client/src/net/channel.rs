//! Live event channel for one puzzle.
//!
//! A single background task owns the WebSocket. It joins the puzzle on every
//! (re)connection, forwards outbound [`ClientEvent`]s, decodes inbound
//! [`ServerEvent`]s and reconnects with backoff when the socket drops.
//! Events queued while offline are dropped; the next `puzzle_update` after
//! rejoining brings the board back in sync.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use sudoku_coop_core::{ClientEvent, PuzzleId, ServerEvent, Session};

use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{ClientError, Result};
use crate::net::backoff::Backoff;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// How long `close` waits for the leave frame to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// What the channel reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Socket is up and `join` has been sent.
    Connected,
    Reconnecting { attempt: u32, delay: Duration },
    Server(ServerEvent),
    /// The server refused the credential during the upgrade. `Closed`
    /// follows; there is no retry.
    Rejected(String),
    /// The task has stopped. Nothing follows.
    Closed,
}

enum Command {
    Send(ClientEvent),
    Shutdown,
}

enum PumpExit {
    Shutdown,
    Disconnected,
}

/// Handle to a puzzle's channel task. Dropping it tears the channel down.
pub struct PuzzleChannel {
    puzzle_id: PuzzleId,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl PuzzleChannel {
    /// Start connecting. Status and inbound events arrive on the receiver.
    pub fn open(
        config: &ClientConfig,
        puzzle_id: PuzzleId,
        session: &Session,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            url: config.ws_url(session.access_token()),
            connect_timeout: config.request_timeout,
            policy: config.reconnect.clone(),
            join: ClientEvent::Join {
                puzzle_id,
                token: session.access_token().to_string(),
            },
            leave: ClientEvent::Leave { puzzle_id },
            commands: command_rx,
            events: event_tx,
        };
        let task = tokio::spawn(worker.run(puzzle_id));

        let channel = Self {
            puzzle_id,
            commands: command_tx,
            task: Some(task),
        };
        (channel, event_rx)
    }

    pub fn puzzle_id(&self) -> PuzzleId {
        self.puzzle_id
    }

    /// Queue an event for the server.
    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.commands
            .send(Command::Send(event))
            .map_err(|_| ClientError::ChannelClosed)
    }

    /// Leave the puzzle, close the socket and wait for the task to finish.
    pub async fn close(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            match tokio::time::timeout(CLOSE_TIMEOUT, task).await {
                Ok(_) => debug!(puzzle_id = self.puzzle_id, "channel closed"),
                Err(_) => warn!(puzzle_id = self.puzzle_id, "channel did not close in time"),
            }
        }
    }
}

impl Drop for PuzzleChannel {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

struct Worker {
    url: String,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    join: ClientEvent,
    leave: ClientEvent,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

impl Worker {
    async fn run(mut self, puzzle_id: PuzzleId) {
        let mut backoff = Backoff::new(self.policy.clone());
        loop {
            match tokio::time::timeout(self.connect_timeout, connect(&self.url)).await {
                Ok(Ok(ws)) => {
                    backoff.reset();
                    info!(puzzle_id, "channel connected");
                    if let PumpExit::Shutdown = self.pump(ws).await {
                        break;
                    }
                    info!(puzzle_id, "channel disconnected");
                }
                Ok(Err(ClientError::Unauthorized(message))) => {
                    warn!(puzzle_id, %message, "channel rejected credential");
                    let _ = self.events.send(ChannelEvent::Rejected(message));
                    break;
                }
                Ok(Err(e)) => warn!(puzzle_id, error = %e, "channel connect failed"),
                Err(_) => warn!(puzzle_id, "channel connect timed out"),
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(puzzle_id, "giving up on channel");
                break;
            };
            let attempt = backoff.attempt();
            if self
                .events
                .send(ChannelEvent::Reconnecting { attempt, delay })
                .is_err()
            {
                break;
            }
            if !self.wait_offline(delay).await {
                break;
            }
        }
        let _ = self.events.send(ChannelEvent::Closed);
    }

    /// Sleep out a backoff delay. Returns `false` if shutdown was requested.
    async fn wait_offline(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Send(event)) => {
                        debug!(?event, "dropping event while offline");
                    }
                    Some(Command::Shutdown) | None => return false,
                },
            }
        }
    }

    async fn pump(&mut self, ws: WsStream) -> PumpExit {
        let (mut sink, mut stream) = ws.split();
        if let Err(e) = send_event(&mut sink, &self.join).await {
            warn!(error = %e, "failed to join puzzle");
            return PumpExit::Disconnected;
        }
        if self.events.send(ChannelEvent::Connected).is_err() {
            self.leave(&mut sink).await;
            return PumpExit::Shutdown;
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send(event)) => {
                        if let Err(e) = send_event(&mut sink, &event).await {
                            warn!(error = %e, "send failed");
                            return PumpExit::Disconnected;
                        }
                    }
                    Some(Command::Shutdown) | None => {
                        self.leave(&mut sink).await;
                        return PumpExit::Shutdown;
                    }
                },
                frame = stream.next() => {
                    if !self.on_frame(frame) {
                        return PumpExit::Disconnected;
                    }
                    if self.events.is_closed() {
                        self.leave(&mut sink).await;
                        return PumpExit::Shutdown;
                    }
                }
            }
        }
    }

    /// Handle one inbound frame. Returns `false` when the socket is gone.
    fn on_frame(
        &self,
        frame: Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> bool {
        match frame {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        debug!(?event, "channel event");
                        let _ = self.events.send(ChannelEvent::Server(event));
                    }
                    Err(e) => warn!(error = %e, frame = text.as_str(), "unrecognised channel frame"),
                }
                true
            }
            Some(Ok(Message::Close(_))) | None => false,
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                warn!(error = %e, "channel read failed");
                false
            }
        }
    }

    async fn leave(&self, sink: &mut WsSink) {
        if let Err(e) = send_event(sink, &self.leave).await {
            debug!(error = %e, "leave not delivered");
        }
        let _ = sink.close().await;
    }
}

async fn send_event(sink: &mut WsSink, event: &ClientEvent) -> Result<()> {
    let json = serde_json::to_string(event)?;
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}

async fn connect(url: &str) -> Result<WsStream> {
    // Only advertise HTTP/1.1: proxies that negotiate HTTP/2 through ALPN
    // break the WebSocket upgrade.
    let connector = if url.starts_with("wss://") {
        let roots =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Some(tokio_tungstenite::Connector::Rustls(Arc::new(config)))
    } else {
        None
    };

    match tokio_tungstenite::connect_async_tls_with_config(url, None, false, connector).await {
        Ok((ws, _)) => Ok(ws),
        Err(Error::Http(response)) if matches!(response.status().as_u16(), 401 | 403) => Err(
            ClientError::Unauthorized(format!("upgrade refused with {}", response.status())),
        ),
        Err(e) => Err(e.into()),
    }
}
