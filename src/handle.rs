use std::fmt;

/// Which kind of conversation a manager drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    Chatroom,
    Direct,
}

/// Which listing a manager is bound to: the channels of one chatroom, or the
/// user's direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationScope {
    Chatroom { chatroom_id: i64 },
    DirectMessages,
}

impl ConversationScope {
    pub fn mode(&self) -> ConversationMode {
        match self {
            ConversationScope::Chatroom { .. } => ConversationMode::Chatroom,
            ConversationScope::DirectMessages => ConversationMode::Direct,
        }
    }

    /// Whether `handle` names a conversation inside this scope.
    pub fn contains(&self, handle: &ConversationHandle) -> bool {
        match (self, handle) {
            (
                ConversationScope::Chatroom { chatroom_id },
                ConversationHandle::Channel { chatroom_id: other, .. },
            ) => chatroom_id == other,
            (ConversationScope::DirectMessages, ConversationHandle::Direct { .. }) => true,
            _ => false,
        }
    }
}

/// Selects the active conversation: a chatroom channel or a DM thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationHandle {
    Channel { chatroom_id: i64, channel_id: i64 },
    Direct { dm_id: i64 },
}

impl ConversationHandle {
    pub fn mode(&self) -> ConversationMode {
        match self {
            ConversationHandle::Channel { .. } => ConversationMode::Chatroom,
            ConversationHandle::Direct { .. } => ConversationMode::Direct,
        }
    }

    /// REST path of the newest history page.
    pub fn history_path(&self) -> String {
        match self {
            ConversationHandle::Channel { channel_id, .. } => {
                format!("/chatroom/get_channel_messages/{channel_id}")
            }
            ConversationHandle::Direct { dm_id } => format!("/chat/get_messages_dm/{dm_id}/messages/"),
        }
    }

    /// Socket path relative to the WebSocket origin, without the token query.
    pub fn socket_path(&self) -> String {
        match self {
            ConversationHandle::Channel { chatroom_id, channel_id } => {
                format!("/ws/chatroom/{chatroom_id}/{channel_id}/")
            }
            ConversationHandle::Direct { dm_id } => format!("/ws/dm/{dm_id}/"),
        }
    }
}

impl fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationHandle::Channel { chatroom_id, channel_id } => {
                write!(f, "chatroom {chatroom_id} / channel {channel_id}")
            }
            ConversationHandle::Direct { dm_id } => write!(f, "dm {dm_id}"),
        }
    }
}
