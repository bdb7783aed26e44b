use serde::Deserialize;
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::errors::ApiResult;
use crate::models::{
    AuthGrant, ChangePasswordData, LoginCredentials, ProfileUpdate, RegisterData, User,
    UserSettings,
};
use crate::transport::{FormPart, HttpTransport, Method, RequestBody};

#[derive(Deserialize)]
struct TokenData {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct MeData {
    user: User,
}

/// Account and profile endpoints under `/user/`.
impl<T: HttpTransport> ApiClient<T> {
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthGrant> {
        let data: TokenData = self.post("/user/login/", credentials).await?.into_data()?;
        Ok(AuthGrant { token: data.token, user: data.user })
    }

    pub async fn register(&self, fields: &RegisterData) -> ApiResult<AuthGrant> {
        let data: TokenData = self.post("/user/register/", fields).await?.into_data()?;
        Ok(AuthGrant { token: data.token, user: data.user })
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.post::<_, Value>("/user/logout/", &serde_json::json!({})).await?;
        Ok(())
    }

    /// Validates the stored token and returns its user.
    pub async fn current_user(&self) -> ApiResult<User> {
        let data: MeData = self.get("/user/me/").await?.into_data()?;
        Ok(data.user)
    }

    pub async fn update_settings(&self, settings: &UserSettings) -> ApiResult<UserSettings> {
        self.put("/user/update_settings/", settings).await?.into_data()
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let parts = update
            .fields()
            .into_iter()
            .map(|(name, value)| FormPart::Text { name: name.to_string(), value })
            .collect();
        self.send(Method::Put, "/user/edit_profile/", RequestBody::Multipart(parts))
            .await?
            .into_data()
    }

    /// Returns the confirmation message from the server.
    pub async fn change_password(&self, fields: &ChangePasswordData) -> ApiResult<String> {
        let envelope = self.put::<_, Value>("/user/change_password/", fields).await?;
        Ok(envelope.message.unwrap_or_else(|| "Password updated".to_string()))
    }

    pub async fn delete_account(&self) -> ApiResult<()> {
        self.delete::<Value>("/user/delete_account/").await?;
        Ok(())
    }
}
