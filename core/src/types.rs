/// Shared wire types for the chat layer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in a conversation. Immutable once created; ordering key is
/// `(created_at, id)` — the id breaks ties between same-timestamp messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub sender_id: i64,
    pub receiver_id: i64,
    /// Wire name kept from the backend schema
    #[serde(rename = "created_date")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl ChatMessage {
    /// Sort key for chronological presentation
    pub fn ordering_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.id)
    }
}

/// Identifies a conversation: one listing, one counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub listing_id: i64,
    pub other_user_id: i64,
}

/// Roster entry: one conversation with summary metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub listing_id: i64,
    pub listing_title: String,
    pub listing_image_url: String,
    pub last_message_time: DateTime<Utc>,
    pub last_message: String,
    pub unread_count: u32,
    pub other_user_id: i64,
    pub other_user_name: String,
    pub is_owner: bool,
}

impl Conversation {
    pub fn key(&self) -> ConversationKey {
        ConversationKey {
            listing_id: self.listing_id,
            other_user_id: self.other_user_id,
        }
    }
}

/// Presence payload carried by `user_online`/`user_offline` pushes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: i64,
}

/// Server push delivered over the channel as `{"event": ..., "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// A message was persisted in this conversation
    NewMessage(ChatMessage),
    /// A participant connected to the listing's channel
    UserOnline(Presence),
    /// A participant disconnected
    UserOffline(Presence),
}

/// Raw history response: `messages` arrive newest-first
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub total_count: u64,
    pub total_pages: u32,
}

/// One page of history, normalized to chronological order
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<ChatMessage>,
    pub total_count: u64,
    pub total_pages: u32,
}

impl HistoryResponse {
    /// Reverse the backend's newest-first slice to oldest-first
    pub fn into_chronological(mut self) -> HistoryPage {
        self.messages.reverse();
        HistoryPage {
            messages: self.messages,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// Wrapper emitted by the roster endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RosterResponse {
    pub listings: Vec<Conversation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_wire_format() {
        let json = r#"{
            "event": "new_message",
            "data": {
                "id": 7,
                "content": "hello",
                "sender_id": 1,
                "receiver_id": 2,
                "created_date": "2024-05-01T10:00:00Z",
                "is_read": false
            }
        }"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        match event {
            PushEvent::NewMessage(msg) => {
                assert_eq!(msg.id, 7);
                assert_eq!(msg.content, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let presence: PushEvent =
            serde_json::from_str(r#"{"event": "user_online", "data": {"user_id": 42}}"#).unwrap();
        match presence {
            PushEvent::UserOnline(p) => assert_eq!(p.user_id, 42),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_history_into_chronological() {
        let resp = HistoryResponse {
            messages: vec![
                ChatMessage {
                    id: 3,
                    content: "newest".to_string(),
                    sender_id: 1,
                    receiver_id: 2,
                    created_at: "2024-05-01T10:02:00Z".parse().unwrap(),
                    is_read: false,
                },
                ChatMessage {
                    id: 2,
                    content: "older".to_string(),
                    sender_id: 2,
                    receiver_id: 1,
                    created_at: "2024-05-01T10:01:00Z".parse().unwrap(),
                    is_read: true,
                },
            ],
            total_count: 2,
            total_pages: 1,
        };

        let page = resp.into_chronological();
        assert_eq!(page.messages[0].id, 2);
        assert_eq!(page.messages[1].id, 3);
    }
}
