pub mod conversation_manager;
pub mod notification_manager;
pub mod session_manager;

pub use conversation_manager::{ConnectionState, ConversationList, ConversationManager, ViewEffect};
pub use notification_manager::{NotificationManager, NOTIFICATIONS_SOCKET_PATH};
pub use session_manager::{CurrentUser, LoginState, SessionManager, PRESENCE_SOCKET_PATH};
