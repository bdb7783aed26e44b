use serde::Deserialize;

use crate::api::chat_api::Pagination;
use crate::api::client::ApiClient;
use crate::errors::ApiResult;
use crate::models::{Chatroom, Membership, NewChatroom, Page, User, UserId};
use crate::transport::{HttpTransport, Method};

/// Public chatrooms the user can ask to join.
pub const CHATROOMS_PATH: &str = "/chatroom/chatrooms/";
pub const JOINED_CHATROOMS_PATH: &str = "/chatroom/get_joined_chatrooms/";
/// Chatrooms the user administers.
pub const MY_CHATROOMS_PATH: &str = "/chatroom/my_chatrooms/";

#[derive(Deserialize)]
struct ChatroomsData {
    #[serde(default)]
    chatrooms: Vec<Chatroom>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

/// The joined-chatrooms listing reuses the `chatrooms` key for memberships.
#[derive(Deserialize)]
struct MembershipsData {
    #[serde(default)]
    chatrooms: Vec<Membership>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct CreatedData {
    chatroom: Chatroom,
}

#[derive(Deserialize)]
struct InvitationUsersData {
    #[serde(default)]
    invitation_users: Vec<User>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

pub fn invitation_users_path(chatroom_id: i64) -> String {
    format!("/chatroom/get_invitation_users/{chatroom_id}")
}

/// Chatroom listings, membership and invitations.
impl<T: HttpTransport> ApiClient<T> {
    pub async fn chatrooms(&self, path_or_cursor: &str) -> ApiResult<Page<Chatroom>> {
        let data: ChatroomsData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.chatrooms))
    }

    pub async fn joined_chatrooms(&self, path_or_cursor: &str) -> ApiResult<Page<Membership>> {
        let data: MembershipsData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.chatrooms))
    }

    pub async fn create_chatroom(&self, fields: &NewChatroom) -> ApiResult<Chatroom> {
        let data: CreatedData = self.post("/chatroom/create_chatroom/", fields).await?.into_data()?;
        Ok(data.chatroom)
    }

    pub async fn delete_chatroom(&self, chatroom_id: i64) -> ApiResult<()> {
        self.action(Method::Delete, &format!("/chatroom/delete_chatroom/{chatroom_id}")).await?;
        Ok(())
    }

    /// Joining is a request the chatroom admin accepts from their notifications.
    pub async fn request_to_join(&self, chatroom_id: i64) -> ApiResult<()> {
        self.action(Method::Post, &format!("/notifications/send_chatroom_request/{chatroom_id}"))
            .await?;
        Ok(())
    }

    pub async fn leave_chatroom(&self, chatroom_id: i64) -> ApiResult<()> {
        self.action(Method::Post, &format!("/chatroom/leave_chatroom/{chatroom_id}")).await?;
        Ok(())
    }

    /// Users that can still be invited to the chatroom.
    pub async fn invitation_users(&self, path_or_cursor: &str) -> ApiResult<Page<User>> {
        let data: InvitationUsersData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.invitation_users))
    }

    pub async fn send_invitation(&self, user_id: UserId, chatroom_id: i64) -> ApiResult<()> {
        self.action(Method::Post, &format!("/chatroom/send_invitation/{user_id}/{chatroom_id}"))
            .await?;
        Ok(())
    }
}
