//! JSON frames exchanged over the chat and presence sockets.
//!
//! Chat frames carry an `action_type` discriminator:
//! - server → client: `chat_message`, `message_edited`, `message_deleted`, `user_status`
//! - client → server: `chat_message`, `edit_message`, `delete_message`, `user_status`
//!
//! Presence frames carry a `type` discriminator (`online_users`). Notification
//! frames carry either the unread backlog or one new notification.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::handle::ConversationHandle;
use crate::models::{FileDescriptor, Message, MessageId, Notification, User, UserId};

/// Per-user presence/typing record inside the active conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(with = "flexible_id")]
    pub user_id: UserId,
    #[serde(with = "py_bool", default)]
    pub in_the_chat_status: bool,
    #[serde(with = "py_bool", default)]
    pub typing: bool,
}

/// Event received on a conversation socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ServerEvent {
    ChatMessage {
        message: Message,
    },
    MessageEdited {
        message_id: MessageId,
        #[serde(default)]
        new_content: String,
    },
    MessageDeleted {
        message_id: MessageId,
    },
    UserStatus {
        #[serde(default, deserialize_with = "lenient_vec")]
        user_status: Vec<UserStatus>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let mut event: ServerEvent = serde_json::from_str(text)?;
        if let ServerEvent::ChatMessage { message } = &mut event {
            if let Some(file) = message.file.as_mut() {
                file.normalize_name();
            }
        }
        Ok(event)
    }
}

/// Body of an outgoing `chat_message`. Exactly one of `channel_id` / `dm_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dm_id: Option<i64>,
    pub sender: User,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDescriptor>,
}

impl OutgoingMessage {
    pub fn new(
        target: ConversationHandle,
        sender: User,
        content: impl Into<String>,
        file: Option<FileDescriptor>,
    ) -> Self {
        let (channel_id, dm_id) = match target {
            ConversationHandle::Channel { channel_id, .. } => (Some(channel_id), None),
            ConversationHandle::Direct { dm_id } => (None, Some(dm_id)),
        };
        Self { channel_id, dm_id, sender, content: content.into(), file }
    }
}

/// Frame sent on a conversation socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum ClientCommand {
    ChatMessage { message: OutgoingMessage },
    EditMessage { message_id: MessageId, new_content: String },
    DeleteMessage { message_id: MessageId },
    UserStatus { user_status: UserStatus },
}

impl ClientCommand {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Event received on the presence socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    OnlineUsers {
        #[serde(default, deserialize_with = "online_ids")]
        online_users: Vec<UserId>,
    },
    #[serde(other)]
    Other,
}

/// Frame received on the notifications socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NotificationEvent {
    /// Unread notifications, sent once when the socket opens.
    Backlog {
        #[serde(deserialize_with = "lenient_vec")]
        notifications: Vec<Notification>,
    },
    Created {
        notification: Notification,
    },
}

/// Decodes an array, skipping elements that don't fit `T`.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let total = items.len();
    let decoded: Vec<T> =
        items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect();
    if decoded.len() < total {
        debug!(skipped = total - decoded.len(), "Skipped malformed entries in frame");
    }
    Ok(decoded)
}

/// Online users arrive as bare ids or as user objects.
fn online_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<UserId>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Online {
        Id(#[serde(deserialize_with = "flexible_id::deserialize")] UserId),
        User {
            #[serde(deserialize_with = "flexible_id::deserialize")]
            id: UserId,
        },
    }

    let mut ids: Vec<UserId> = Vec::new();
    for entry in lenient_vec::<D, Online>(deserializer)? {
        let (Online::Id(id) | Online::User { id }) = entry;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// The backend writes flags as Python-style `"True"`/`"False"` strings.
mod py_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Text(String),
        }
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Text(s) => s.eq_ignore_ascii_case("true"),
        })
    }
}

/// User ids arrive as numbers or numeric strings; they are sent as strings.
mod flexible_id {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Id {
            Number(i64),
            Text(String),
        }
        match Id::deserialize(deserializer)? {
            Id::Number(n) => Ok(n),
            Id::Text(s) => s.trim().parse().map_err(D::Error::custom),
        }
    }
}
