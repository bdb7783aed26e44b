pub mod chat_api;
pub mod chatroom_api;
pub mod client;
pub mod notifications_api;
pub mod social_api;
pub mod user_api;

pub use chat_api::{channels_path, DIRECT_MESSAGES_PATH};
pub use chatroom_api::{invitation_users_path, CHATROOMS_PATH, JOINED_CHATROOMS_PATH, MY_CHATROOMS_PATH};
pub use client::{ApiClient, Envelope};
pub use notifications_api::{reply_path, NotificationReply};
pub use social_api::{FRIENDS_PATH, USERS_PATH};
