use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use palaver_protocol::{parse_server_event, ClientEvent, ParseError, RoomIntent};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::state::ClientState;
use crate::{ChatConfig, ChatEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle as surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// A connect attempt or live connection failed; a reconnect is pending.
    Error,
    /// Reconnect attempts are exhausted; only a visibility change resumes.
    Failed,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting)
    }
}

/// Exponential backoff settings for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * factor).min(self.max_delay)
    }
}

/// Rate limiter for connect-error logging. Repeated errors within the
/// window drop from `warn` to `debug` so a flapping network does not
/// flood the log.
pub(crate) struct ErrorThrottle {
    window: Duration,
    last_warn: Option<Instant>,
}

impl ErrorThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_warn: None,
        }
    }

    pub fn should_warn(&mut self, now: Instant) -> bool {
        let due = self
            .last_warn
            .is_none_or(|last| now.duration_since(last) >= self.window);
        if due {
            self.last_warn = Some(now);
        }
        due
    }
}

/// Items the handle pushes toward the socket.
pub(crate) enum Outgoing {
    Event(ClientEvent),
    Shutdown,
}

/// Why a live connection ended.
enum Disconnect {
    /// Local `disconnect()`: terminal for this session.
    Client,
    /// Server closed the socket or the stream ended: reconnect.
    Server,
    /// Transport failure: reconnect.
    Transport,
}

pub(crate) fn connect_url(config: &ChatConfig) -> String {
    format!(
        "{}?userId={}&userName={}",
        config.url,
        urlencoding::encode(&config.user.id),
        urlencoding::encode(&config.user.name),
    )
}

/// Connection task: owns the socket for the client's whole lifetime.
///
/// Reconnection is owned entirely here; any transport-level auto-reconnect
/// is unused. Attempts follow the backoff policy, are deferred while the
/// visibility gate reports hidden, and stop at `Failed` after the policy's
/// maximum, until a hidden-to-visible transition resets the counter.
pub(crate) async fn run_connection(
    config: ChatConfig,
    state: Arc<ClientState>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<ChatEvent>,
    mut visibility: watch::Receiver<bool>,
) {
    let url = connect_url(&config);
    let policy = config.reconnect.clone();
    let mut throttle = ErrorThrottle::new(Duration::from_secs(10));

    loop {
        // Defer entirely while hidden; regaining visibility while
        // disconnected resets the attempt counter.
        if !*visibility.borrow() {
            if !wait_for_visible(&mut visibility, &mut outgoing).await {
                teardown(&state, &events);
                return;
            }
            state.reset_attempts();
        }

        publish(&state, &events, ConnectionStatus::Connecting);

        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                state.reset_attempts();
                publish(&state, &events, ConnectionStatus::Connected);

                match drive(ws, &config, &state, &mut outgoing, &events).await {
                    Disconnect::Client => {
                        teardown(&state, &events);
                        return;
                    }
                    Disconnect::Server | Disconnect::Transport => {
                        publish(&state, &events, ConnectionStatus::Error);
                    }
                }
            }
            Err(e) => {
                if throttle.should_warn(Instant::now()) {
                    tracing::warn!(error = %e, url = %config.url, "Connect error");
                } else {
                    tracing::debug!(error = %e, "Connect error (repeat within window)");
                }
                publish(&state, &events, ConnectionStatus::Error);
            }
        }

        let attempt = state.next_attempt();
        if attempt > policy.max_attempts {
            publish(&state, &events, ConnectionStatus::Failed);
            tracing::warn!(
                max_attempts = policy.max_attempts,
                "Reconnect attempts exhausted; waiting for visibility"
            );
            if !wait_for_visible(&mut visibility, &mut outgoing).await {
                teardown(&state, &events);
                return;
            }
            state.reset_attempts();
            continue;
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        if !backoff(delay, &mut outgoing).await {
            teardown(&state, &events);
            return;
        }
    }
}

/// Drive a live socket: handshake, then pump frames both ways.
async fn drive(
    mut ws: WsStream,
    config: &ChatConfig,
    state: &ClientState,
    outgoing: &mut mpsc::UnboundedReceiver<Outgoing>,
    events: &mpsc::UnboundedSender<ChatEvent>,
) -> Disconnect {
    // Handshake: authenticate, then replay every tracked membership as a
    // fresh join. This is how membership survives a dropped connection.
    let auth = ClientEvent::Authenticate(config.user.auth_payload());
    if ws.send(Message::Text(auth.to_wire_format())).await.is_err() {
        return Disconnect::Transport;
    }
    for room_id in state.room_ids() {
        let join = ClientEvent::JoinRoom(RoomIntent {
            room_id,
            user_id: config.user.id.clone(),
            user_name: config.user.name.clone(),
        });
        if ws.send(Message::Text(join.to_wire_format())).await.is_err() {
            return Disconnect::Transport;
        }
    }

    loop {
        tokio::select! {
            item = outgoing.recv() => match item {
                Some(Outgoing::Event(event)) => {
                    if ws
                        .send(Message::Text(event.to_wire_format()))
                        .await
                        .is_err()
                    {
                        return Disconnect::Transport;
                    }
                }
                Some(Outgoing::Shutdown) | None => {
                    let _ = ws.close(None).await;
                    return Disconnect::Client;
                }
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_server_event(&text) {
                    Ok(event) => {
                        let _ = events.send(ChatEvent::Server(event));
                    }
                    Err(ParseError::UnknownEvent(name)) => {
                        tracing::debug!(event = %name, "Ignoring unknown server event");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to parse server event");
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return Disconnect::Transport;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Disconnect::Server,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket error");
                    return Disconnect::Transport;
                }
            },
        }
    }
}

/// Sleep out the backoff delay while staying responsive to shutdown.
/// Returns false if the client shut down during the wait.
async fn backoff(delay: Duration, outgoing: &mut mpsc::UnboundedReceiver<Outgoing>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return true,
            item = outgoing.recv() => match item {
                // Events while disconnected have nowhere to go.
                Some(Outgoing::Event(_)) => {}
                Some(Outgoing::Shutdown) | None => return false,
            },
        }
    }
}

/// Wait for the gate to report visible. Returns false on shutdown.
async fn wait_for_visible(
    visibility: &mut watch::Receiver<bool>,
    outgoing: &mut mpsc::UnboundedReceiver<Outgoing>,
) -> bool {
    loop {
        tokio::select! {
            changed = visibility.changed() => {
                if changed.is_err() {
                    return false;
                }
                if *visibility.borrow() {
                    return true;
                }
            }
            item = outgoing.recv() => match item {
                Some(Outgoing::Event(_)) => {}
                Some(Outgoing::Shutdown) | None => return false,
            },
        }
    }
}

fn publish(state: &ClientState, events: &mpsc::UnboundedSender<ChatEvent>, status: ConnectionStatus) {
    state.set_status(status);
    let _ = events.send(ChatEvent::Status(status));
}

fn teardown(state: &ClientState, events: &mpsc::UnboundedSender<ChatEvent>) {
    state.clear_rooms();
    publish(state, events, ConnectionStatus::Disconnected);
}
