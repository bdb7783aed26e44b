use serde::Deserialize;

use crate::api::client::ApiClient;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Notification, NotificationKind};
use crate::transport::{HttpTransport, Method};

#[derive(Deserialize)]
struct NotificationsData {
    #[serde(default)]
    notifications: Vec<Notification>,
}

/// Answer to a friend request, chatroom invitation or join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationReply {
    Accept,
    Reject,
}

/// Endpoint answering a notification of `kind`; `None` when there is nothing to answer.
pub fn reply_path(kind: NotificationKind, reply: NotificationReply, notification_id: i64) -> Option<String> {
    use NotificationReply::{Accept, Reject};

    let action = match (kind, reply) {
        (NotificationKind::FriendRequest, Accept) => "accept_friendship",
        (NotificationKind::FriendRequest, Reject) => "decline_friendship",
        (NotificationKind::ChatroomInvitation, Accept) => "accept_invitation",
        (NotificationKind::ChatroomInvitation, Reject) => "reject_invitation",
        (NotificationKind::ChatroomJoinRequest, Accept) => "accept_chatroom_request",
        (NotificationKind::ChatroomJoinRequest, Reject) => "reject_chatroom_request",
        (NotificationKind::Message | NotificationKind::Other, _) => return None,
    };
    Some(format!("/notifications/{action}/{notification_id}"))
}

/// Notification listing and replies under `/notifications/`.
impl<T: HttpTransport> ApiClient<T> {
    pub async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        let data: NotificationsData =
            self.get("/notifications/get_notifications/").await?.into_data()?;
        Ok(data.notifications)
    }

    pub async fn mark_all_read(&self) -> ApiResult<()> {
        self.action(Method::Put, "/notifications/mark_all_read/").await?;
        Ok(())
    }

    pub async fn reply_to_notification(
        &self,
        notification_id: i64,
        kind: NotificationKind,
        reply: NotificationReply,
    ) -> ApiResult<()> {
        let path = reply_path(kind, reply, notification_id).ok_or_else(|| {
            ApiError::Unexpected(format!("{kind:?} notifications cannot be answered"))
        })?;
        self.action(Method::Put, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_paths_follow_the_notification_kind() {
        assert_eq!(
            reply_path(NotificationKind::FriendRequest, NotificationReply::Reject, 3).as_deref(),
            Some("/notifications/decline_friendship/3")
        );
        assert_eq!(
            reply_path(NotificationKind::ChatroomJoinRequest, NotificationReply::Accept, 8).as_deref(),
            Some("/notifications/accept_chatroom_request/8")
        );
        assert_eq!(reply_path(NotificationKind::Message, NotificationReply::Accept, 1), None);
    }
}
