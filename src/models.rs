use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type MessageId = i64;

/// Prefix the backend puts in front of every uploaded file URL.
const UPLOADS_PREFIX: &str = "/files/uploads/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub darkmode: bool,
    #[serde(default)]
    pub request_notifications: bool,
    #[serde(default)]
    pub message_notifications: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<FileDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
}

impl User {
    /// Replaces profile fields with `updated` while keeping the settings we already hold
    /// when the response omits them.
    pub fn merge_profile(&mut self, updated: User) {
        let settings = updated.settings.clone().or_else(|| self.settings.take());
        *self = User { settings, ..updated };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileDescriptor {
    /// Derives `file_name` from the upload URL, which is how the backend names stored files.
    pub fn normalize_name(&mut self) {
        if let Some(url) = &self.url {
            self.file_name = url.replace(UPLOADS_PREFIX, "");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDescriptor>,
}

impl Message {
    pub fn new(id: MessageId, sender: User, content: impl Into<String>) -> Self {
        Self { id, content: content.into(), sender, timestamp: None, file: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: i64,
    pub user: User,
    pub other_user: User,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// The administrator; the backend sends it as a bare user id.
    #[serde(default, rename = "user")]
    pub admin_id: Option<UserId>,
}

/// The current user's membership in a chatroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub chatroom: Chatroom,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Message,
    ChatroomInvitation,
    ChatroomJoinRequest,
    FriendRequest,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    /// Friend requests, invitations and join requests wait for an answer.
    pub fn is_actionable(self) -> bool {
        matches!(
            self,
            NotificationKind::ChatroomInvitation
                | NotificationKind::ChatroomJoinRequest
                | NotificationKind::FriendRequest
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub notification_type: NotificationKind,
    #[serde(default)]
    pub notification_message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// The friendship request, invitation, join request or message behind it.
    #[serde(default)]
    pub content_object: Option<serde_json::Value>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Token and user returned by login and registration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthGrant {
    pub token: String,
    pub user: User,
}

// ── Request bodies ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordData {
    pub old_password: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// Profile edit form; `None` fields are left out of the submitted form.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        [
            ("username", &self.username),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("bio", &self.bio),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewChatroom {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
}

/// A local file chosen for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
