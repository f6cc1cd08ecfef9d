#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::{
        parse_server_event, AuthPayload, ClientEvent, MessageStatus, ParseError, RoomIntent,
        ServerEvent, TypingIntent,
    };

    #[test]
    fn test_parse_new_message() {
        let text = r#"{
            "event": "newMessage",
            "data": {
                "id": "msg_42",
                "roomId": "r1",
                "senderId": "u7",
                "senderName": "Dana",
                "content": "hello",
                "type": "text",
                "timestamp": "2024-03-01T12:00:00Z",
                "status": "sent",
                "tempId": "temp_abc"
            }
        }"#;

        let event = parse_server_event(text).unwrap();
        let ServerEvent::NewMessage(msg) = event else {
            panic!("expected NewMessage");
        };
        assert_eq!(msg.id, "msg_42");
        assert_eq!(msg.room_id, "r1");
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.temp_id.as_deref(), Some("temp_abc"));
        assert!(!msg.is_optimistic);
    }

    #[test]
    fn test_parse_delivery_receipt() {
        let text = r#"{
            "event": "messageDelivered",
            "data": {
                "messageId": "msg_42",
                "roomId": "r1",
                "deliveredAt": "2024-03-01T12:00:05Z"
            }
        }"#;

        let event = parse_server_event(text).unwrap();
        let ServerEvent::MessageDelivered(receipt) = event else {
            panic!("expected MessageDelivered");
        };
        assert_eq!(receipt.message_id, "msg_42");
        assert_eq!(
            receipt.delivered_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_typing_signal() {
        let text = r#"{
            "event": "userTyping",
            "data": {
                "roomId": "r1",
                "userId": "u7",
                "userName": "Dana",
                "isTyping": true
            }
        }"#;

        let event = parse_server_event(text).unwrap();
        let ServerEvent::UserTyping(signal) = event else {
            panic!("expected UserTyping");
        };
        assert!(signal.is_typing);
    }

    #[test]
    fn test_parse_room_created() {
        let text = r#"{
            "event": "roomCreated",
            "data": {
                "room": {
                    "id": "r9",
                    "name": "Physics study group",
                    "participants": [
                        {"userId": "u1", "userName": "Avery"},
                        {"userId": "u7", "userName": "Dana"}
                    ]
                }
            }
        }"#;

        let event = parse_server_event(text).unwrap();
        let ServerEvent::RoomCreated { room } = event else {
            panic!("expected RoomCreated");
        };
        assert_eq!(room.id, "r9");
        assert!(room.has_participant("u7"));
        assert!(!room.has_participant("u8"));
    }

    #[test]
    fn test_parse_unknown_event() {
        let text = r#"{"event": "somethingNew", "data": {}}"#;
        let err = parse_server_event(text).unwrap_err();
        assert!(matches!(err, ParseError::UnknownEvent(name) if name == "somethingNew"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_server_event("  "), Err(ParseError::EmptyEvent)));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_server_event("not json"),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_bad_payload() {
        let text = r#"{"event": "messageRead", "data": {"messageId": 5}}"#;
        let err = parse_server_event(text).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPayload { event, .. } if event == "messageRead"));
    }

    #[test]
    fn test_client_event_wire_names() {
        let join = ClientEvent::JoinRoom(RoomIntent {
            room_id: "r1".to_string(),
            user_id: "u7".to_string(),
            user_name: "Dana".to_string(),
        });
        let wire: serde_json::Value = serde_json::from_str(&join.to_wire_format()).unwrap();
        assert_eq!(wire["event"], "joinRoom");
        assert_eq!(wire["data"]["roomId"], "r1");
        assert_eq!(wire["data"]["userId"], "u7");

        let auth = ClientEvent::Authenticate(AuthPayload {
            user_id: "u7".to_string(),
            user_name: "Dana".to_string(),
            user_email: "dana@example.edu".to_string(),
            user_role: "student".to_string(),
        });
        let wire: serde_json::Value = serde_json::from_str(&auth.to_wire_format()).unwrap();
        assert_eq!(wire["event"], "authenticate");
        assert_eq!(wire["data"]["userEmail"], "dana@example.edu");
    }

    #[test]
    fn test_stop_typing_wire_name() {
        let stop = ClientEvent::StopTyping(TypingIntent {
            room_id: "r1".to_string(),
            user_id: "u7".to_string(),
            user_name: "Dana".to_string(),
        });
        let wire: serde_json::Value = serde_json::from_str(&stop.to_wire_format()).unwrap();
        assert_eq!(wire["event"], "stopTyping");
    }

    #[test]
    fn test_status_lattice() {
        use MessageStatus::*;

        assert!(Sending.can_advance_to(Sent));
        assert!(Sent.can_advance_to(Read));
        assert!(Delivered.can_advance_to(Read));

        // Never regress or repeat
        assert!(!Read.can_advance_to(Delivered));
        assert!(!Delivered.can_advance_to(Delivered));
        assert!(!Read.can_advance_to(Sent));

        // Failed sits outside the lattice
        assert!(!Failed.can_advance_to(Read));
        assert!(!Sent.can_advance_to(Failed));
    }
}
