use serde::Deserialize;

use crate::api::chat_api::Pagination;
use crate::api::client::ApiClient;
use crate::errors::ApiResult;
use crate::models::{Page, User, UserId};
use crate::transport::{HttpTransport, Method};

pub const FRIENDS_PATH: &str = "/user/get_friends/";
/// Users who are neither friends nor blocked, for finding new contacts.
pub const USERS_PATH: &str = "/user/get_users/";

#[derive(Deserialize)]
struct FriendsData {
    #[serde(default)]
    friends: Vec<User>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct UsersData {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct BlockedData {
    #[serde(default)]
    blocked_users: Vec<User>,
}

#[derive(Deserialize)]
struct ProfileData {
    user: User,
}

/// Friends, blocking, user search and friend requests.
impl<T: HttpTransport> ApiClient<T> {
    pub async fn friends(&self, path_or_cursor: &str) -> ApiResult<Page<User>> {
        let data: FriendsData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.friends))
    }

    pub async fn search_users(&self, path_or_cursor: &str) -> ApiResult<Page<User>> {
        let data: UsersData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.users))
    }

    pub async fn user_profile(&self, username: &str) -> ApiResult<User> {
        let data: ProfileData =
            self.get(&format!("/user/get_user_profile/{username}")).await?.into_data()?;
        Ok(data.user)
    }

    pub async fn blocked_users(&self) -> ApiResult<Vec<User>> {
        let data: BlockedData = self.get("/user/get_blocked_users/").await?.into_data()?;
        Ok(data.blocked_users)
    }

    pub async fn block_user(&self, user_id: UserId) -> ApiResult<Option<String>> {
        self.action(Method::Post, &format!("/user/block_user/{user_id}")).await
    }

    pub async fn unblock_user(&self, user_id: UserId) -> ApiResult<Option<String>> {
        self.action(Method::Post, &format!("/user/unblock_user/{user_id}")).await
    }

    pub async fn remove_friend(&self, friend_id: UserId) -> ApiResult<()> {
        self.action(Method::Post, &format!("/user/remove_friendship/{friend_id}")).await?;
        Ok(())
    }

    /// Creates a friend request; the recipient answers it from their notifications.
    pub async fn send_friend_request(&self, user_id: UserId) -> ApiResult<()> {
        self.action(Method::Post, &format!("/notifications/send_friendship_request/{user_id}"))
            .await?;
        Ok(())
    }
}
