mod api;
mod connection;
mod handle;
mod handler;
mod receiver;
mod state;
mod visibility;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

pub use api::{ChatApi, MessagePage, RoomUpdate};
pub use connection::{ConnectionStatus, ReconnectPolicy};
pub use handle::ChatHandle;
pub use handler::ChatHandler;
pub use receiver::Receiver;
pub use state::UserInfo;
pub use visibility::Visibility;

pub use palaver_protocol::{
    ClientEvent, DeliveryReceipt, Message, MessageDraft, MessageKind, MessageStatus,
    PresenceStatus, PresenceUpdate, ReadReceipt, Room, RoomEvent, ServerEvent, TypingSignal,
};

use state::ClientState;

/// Client configuration.
#[derive(Clone)]
pub struct ChatConfig {
    /// WebSocket endpoint, e.g. `ws://host/socket`. `userId`/`userName`
    /// query parameters are appended at connect time.
    pub url: String,
    pub user: UserInfo,
    pub reconnect: ReconnectPolicy,
    /// Reconnect gate, shared with the embedding layer's visibility events.
    pub visibility: Visibility,
}

impl ChatConfig {
    pub fn new(url: &str, user: UserInfo) -> Self {
        Self {
            url: url.to_string(),
            user,
            reconnect: ReconnectPolicy::default(),
            visibility: Visibility::default(),
        }
    }
}

/// Events flowing from the connection task to the dispatch loop.
#[derive(Debug)]
pub enum ChatEvent {
    Status(ConnectionStatus),
    Server(ServerEvent),
}

/// Main chat client.
///
/// Owns exactly one connection for its lifetime: construction spawns the
/// connection task, which keeps reconnecting per the backoff policy until
/// [`ChatHandle::disconnect`] ends the session. Connection failures are
/// never returned as errors - they surface as [`ConnectionStatus`]
/// transitions through the handler.
pub struct ChatClient {
    receiver: Receiver,
    handle: ChatHandle,
    visibility: Visibility,
}

impl ChatClient {
    /// Spawn the connection task and return the client.
    ///
    /// Must be called within a tokio runtime. Returns immediately; watch
    /// `on_status` for the outcome of the first attempt.
    pub fn connect(config: ChatConfig) -> Self {
        let state = Arc::new(ClientState::new());
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let visibility = config.visibility.clone();
        let visibility_rx = visibility.subscribe();
        let handle = ChatHandle::new(out_tx, state.clone(), config.user.clone());

        tokio::spawn(connection::run_connection(
            config,
            state,
            out_rx,
            event_tx,
            visibility_rx,
        ));

        let receiver = Receiver::new(event_rx, handle.clone());
        Self {
            receiver,
            handle,
            visibility,
        }
    }

    /// Cloneable handle for sending intents from anywhere.
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// The reconnect gate, for wiring to host visibility events.
    pub fn visibility(&self) -> Visibility {
        self.visibility.clone()
    }

    /// Run the dispatch loop until the session ends.
    pub async fn run<H: ChatHandler>(&mut self, handler: &mut H) -> Result<()> {
        self.receiver.run(handler).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::StreamExt;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::WebSocketStream;

    use super::*;

    fn test_user() -> UserInfo {
        UserInfo {
            id: "u7".to_string(),
            name: "Dana".to_string(),
            email: "dana@example.edu".to_string(),
            role: "student".to_string(),
        }
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(40),
            backoff_multiplier: 2.0,
        }
    }

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return serde_json::from_str(&text).unwrap();
                }
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        statuses: Arc<Mutex<Vec<ConnectionStatus>>>,
        handle: Option<ChatHandle>,
        joined: bool,
    }

    impl ChatHandler for Recorder {
        async fn on_status(&mut self, status: ConnectionStatus) {
            if let Ok(mut statuses) = self.statuses.lock() {
                statuses.push(status);
            }
            if status == ConnectionStatus::Connected
                && !self.joined
                && let Some(handle) = &self.handle
            {
                self.joined = true;
                handle.join_room("r1");
                handle.join_room("r2");
            }
        }
    }

    #[tokio::test]
    async fn test_membership_replayed_after_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // First session: authenticate, then two explicit joins.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let auth = next_text(&mut ws).await;
            assert_eq!(auth["event"], "authenticate");
            assert_eq!(auth["data"]["userId"], "u7");
            for _ in 0..2 {
                let join = next_text(&mut ws).await;
                assert_eq!(join["event"], "joinRoom");
            }
            // Sever the connection without a goodbye.
            drop(ws);

            // Second session: authenticate, then the replayed joins.
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let auth = next_text(&mut ws).await;
            assert_eq!(auth["event"], "authenticate");
            let mut rooms = Vec::new();
            for _ in 0..2 {
                let join = next_text(&mut ws).await;
                assert_eq!(join["event"], "joinRoom");
                rooms.push(join["data"]["roomId"].as_str().unwrap().to_string());
            }
            rooms.sort();
            rooms
        });

        let mut config = ChatConfig::new(&format!("ws://{addr}"), test_user());
        config.reconnect = fast_policy();
        let mut client = ChatClient::connect(config);
        let handle = client.handle();

        let mut recorder = Recorder {
            handle: Some(handle.clone()),
            ..Recorder::default()
        };
        let runner = tokio::spawn(async move { client.run(&mut recorder).await });

        let replayed = timeout(Duration::from_secs(5), server)
            .await
            .expect("server timed out")
            .unwrap();
        assert_eq!(replayed, vec!["r1".to_string(), "r2".to_string()]);

        handle.disconnect();
        let _ = timeout(Duration::from_secs(5), runner).await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_freeze_until_visible() {
        // A port with nothing listening: every attempt is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = ChatConfig::new(&format!("ws://{addr}"), test_user());
        config.reconnect = ReconnectPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        };
        let visibility = config.visibility.clone();

        let mut client = ChatClient::connect(config);
        let handle = client.handle();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let mut recorder = Recorder {
            statuses: statuses.clone(),
            ..Recorder::default()
        };
        let runner = tokio::spawn(async move { client.run(&mut recorder).await });

        let failed_at = timeout(Duration::from_secs(5), async {
            loop {
                {
                    let seen = statuses.lock().unwrap();
                    if let Some(pos) = seen.iter().position(|s| *s == ConnectionStatus::Failed) {
                        break pos;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("never reached failed");

        // No automatic attempts while failed.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(statuses.lock().unwrap().len(), failed_at + 1);

        // Visibility regained: the counter resets and attempts resume.
        visibility.set_visible(true);
        timeout(Duration::from_secs(5), async {
            loop {
                {
                    let seen = statuses.lock().unwrap();
                    if seen[failed_at + 1..].contains(&ConnectionStatus::Connecting) {
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no retry after visibility change");

        handle.disconnect();
        let _ = timeout(Duration::from_secs(5), runner).await;
    }

    #[tokio::test]
    async fn test_hidden_client_defers_initial_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let visibility = Visibility::new(false);
        let mut config = ChatConfig::new(&format!("ws://{addr}"), test_user());
        config.visibility = visibility.clone();
        let client = ChatClient::connect(config);

        // Hidden: no connection attempt arrives.
        assert!(
            timeout(Duration::from_millis(200), listener.accept())
                .await
                .is_err()
        );

        visibility.set_visible(true);
        let (stream, _) = timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("no connect after becoming visible")
            .unwrap();
        let _ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        client.handle().disconnect();
    }
}
