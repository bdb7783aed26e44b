//! Client-side state core for the neurocom chat backend.
//!
//! [`SessionManager`] owns authentication, the presence feed and the
//! notification feed,
//! [`ConversationManager`] owns one chatroom's channels or the user's direct
//! messages. Both talk to the backend only through [`HttpTransport`] and
//! [`SocketConnector`], so the same code drives the Leptos frontend, native
//! tools (feature `native`) and the in-memory fakes used by the tests.

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod handle;
pub mod managers;
pub mod models;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod transport;

#[cfg(feature = "native")]
pub mod native;

pub use api::{ApiClient, NotificationReply};
pub use client::ChatClient;
pub use config::{ClientConfig, ReconnectPolicy};
pub use errors::{normalize_error, ApiError, ApiResult, ConfigError, ErrorDetails, SocketError};
pub use handle::{ConversationHandle, ConversationMode, ConversationScope};
pub use managers::{
    ConnectionState, ConversationList, ConversationManager, CurrentUser, LoginState,
    NotificationManager, SessionManager, ViewEffect,
};
pub use state::{is_at_bottom, ScrollMetrics};
pub use storage::{MemoryTokenStore, TokenStore, AUTH_TOKEN_KEY};
pub use transport::{
    ChatSocket, ConnectionTag, HttpRequest, HttpResponse, HttpTransport, SocketConnector,
    SocketEvent, SocketRole, TransportError,
};
