use serde::Deserialize;

use crate::api::client::ApiClient;
use crate::errors::ApiResult;
use crate::models::{Channel, DirectMessage, FileDescriptor, FileUpload, Message, Page};
use crate::transport::{FormPart, HttpTransport, Method, RequestBody};

pub const DIRECT_MESSAGES_PATH: &str = "/chat/get_direct_messages/";

/// `pagination` block of list responses; the backend sends `null` for unpaginated lists.
#[derive(Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    previous: Option<String>,
}

impl Pagination {
    pub(crate) fn page<T>(pagination: Option<Pagination>, items: Vec<T>) -> Page<T> {
        let Pagination { next, previous } = pagination.unwrap_or_default();
        Page { items, next, previous }
    }
}

#[derive(Deserialize)]
struct MessagesData {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct DirectMessagesData {
    #[serde(default)]
    direct_messages: Vec<DirectMessage>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ChannelsData {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct AdminData {
    is_admin: bool,
}

#[derive(Deserialize)]
struct UploadData {
    file: FileDescriptor,
}

pub fn channels_path(chatroom_id: i64) -> String {
    format!("/chatroom/get_channels/{chatroom_id}")
}

/// Conversation, history and file endpoints.
impl<T: HttpTransport> ApiClient<T> {
    /// One history page, newest message first. `path_or_cursor` is either the
    /// conversation's history path or a `next` cursor from an earlier page.
    pub async fn messages(&self, path_or_cursor: &str) -> ApiResult<Page<Message>> {
        let data: MessagesData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.messages))
    }

    pub async fn direct_messages(&self, path_or_cursor: &str) -> ApiResult<Page<DirectMessage>> {
        let data: DirectMessagesData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Pagination::page(data.pagination, data.direct_messages))
    }

    /// Channel listings are not paginated by the backend.
    pub async fn channels(&self, path_or_cursor: &str) -> ApiResult<Page<Channel>> {
        let data: ChannelsData = self.get(path_or_cursor).await?.into_data()?;
        Ok(Page { items: data.channels, next: None, previous: None })
    }

    pub async fn is_chatroom_admin(&self, chatroom_id: i64) -> ApiResult<bool> {
        let data: AdminData = self
            .get(&format!("/chatroom/is_admin/{chatroom_id}"))
            .await?
            .into_data()?;
        Ok(data.is_admin)
    }

    pub async fn upload_file(&self, upload: FileUpload) -> ApiResult<FileDescriptor> {
        let part = FormPart::File {
            name: "file".to_string(),
            file_name: upload.file_name,
            content_type: upload.content_type,
            bytes: upload.bytes,
        };
        let data: UploadData = self
            .send(Method::Post, "/files/upload/", RequestBody::Multipart(vec![part]))
            .await?
            .into_data()?;
        Ok(data.file)
    }
}
