use std::env;

use anyhow::Result;
use chrono::Utc;
use palaver_client::{
    ChatApi, ChatClient, ChatConfig, ChatHandle, ChatHandler, ConnectionStatus, Message,
    MessageDraft, MessageKind, ServerEvent, TypingSignal, UserInfo,
};
use palaver_sync::TrackedChat;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

struct TermChat {
    chat: std::sync::Arc<Mutex<TrackedChat>>,
}

impl ChatHandler for TermChat {
    async fn on_status(&mut self, status: ConnectionStatus) {
        println!("* connection: {status:?}");
    }

    async fn on_message(&mut self, message: &Message) {
        let mut chat = self.chat.lock().await;
        chat.apply(&ServerEvent::NewMessage(message.clone()), Utc::now());
        println!(
            "[{}] {}: {}",
            message.room_id, message.sender_name, message.content
        );
    }

    async fn on_typing(&mut self, signal: &TypingSignal) {
        let mut chat = self.chat.lock().await;
        chat.apply(&ServerEvent::UserTyping(signal.clone()), Utc::now());
        if signal.is_typing {
            println!("[{}] {} is typing...", signal.room_id, signal.user_name);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /join <room>   - Join a room");
    println!("  /leave <room>  - Leave a room");
    println!("  /room <room>   - Switch to a room");
    println!("  /rooms         - List joined rooms");
    println!("  /quit          - Exit");
    println!("  <message>      - Send message to current room");
}

async fn send(
    chat: &Mutex<TrackedChat>,
    api: &ChatApi,
    user: &UserInfo,
    room_id: &str,
    content: &str,
) {
    let draft = MessageDraft {
        room_id: room_id.to_string(),
        sender_id: user.id.clone(),
        sender_name: user.name.clone(),
        content: content.to_string(),
        kind: MessageKind::Text,
        file_size: None,
    };

    let optimistic = {
        let mut chat = chat.lock().await;
        match chat.send_optimistic(draft, Utc::now()) {
            Ok(msg) => msg,
            Err(e) => {
                println!("! {e}");
                return;
            }
        }
    };

    let temp_id = optimistic.id.clone();
    match api.post_message(&optimistic).await {
        Ok(canonical) => chat.lock().await.confirm_sent(&temp_id, canonical),
        Err(e) => {
            chat.lock().await.mark_failed(room_id, &temp_id);
            println!("! send failed (kept for retry): {e}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let ws_url = env::var("PALAVER_WS").unwrap_or_else(|_| "ws://localhost:3001".to_string());
    let api_url = env::var("PALAVER_API").unwrap_or_else(|_| "http://localhost:3001".to_string());

    let user = UserInfo {
        id: env::var("PALAVER_USER").unwrap_or_else(|_| "demo".to_string()),
        name: env::var("PALAVER_NAME").unwrap_or_else(|_| "Demo User".to_string()),
        email: "demo@example.edu".to_string(),
        role: "student".to_string(),
    };

    println!("Connecting to {ws_url}...");
    let mut client = ChatClient::connect(ChatConfig::new(&ws_url, user.clone()));
    let api = ChatApi::new(&api_url);
    let chat = std::sync::Arc::new(Mutex::new(TrackedChat::new(&user.id)));
    print_help();

    let input_handle: ChatHandle = client.handle();
    let input_chat = chat.clone();
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let mut current_room: Option<String> = None;

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix('/') {
                let (cmd, arg) = rest.split_once(' ').unwrap_or((rest, ""));
                match (cmd, arg.trim()) {
                    ("help", _) => print_help(),
                    ("join", room) if !room.is_empty() => {
                        if !input_handle.join_room(room) {
                            println!("! not connected");
                        }
                    }
                    ("leave", room) if !room.is_empty() => {
                        input_handle.leave_room(room);
                    }
                    ("room", room) if !room.is_empty() => {
                        input_chat.lock().await.select_room(Some(room));
                        input_handle.mark_room_read(room);
                        current_room = Some(room.to_string());
                        println!("Switched to room: {room}");
                    }
                    ("rooms", _) => println!("Joined: {:?}", input_handle.rooms()),
                    ("quit", _) => break,
                    _ => println!("Unknown command, try /help"),
                }
                continue;
            }
            match &current_room {
                Some(room) => send(&input_chat, &api, &user, room, line).await,
                None => println!("! no room selected, use /room <room>"),
            }
        }

        input_handle.disconnect();
    });

    let mut handler = TermChat { chat };
    client.run(&mut handler).await
}
