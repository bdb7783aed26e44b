pub mod compose;
pub mod message_log;
pub mod pagination;
pub mod scroll;

pub use compose::{ComposeState, PendingUpload};
pub use message_log::MessageLog;
pub use pagination::{PageTicket, PageTrack};
pub use scroll::{is_at_bottom, ScrollMetrics};
