use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::errors::{normalize_error, ApiError, ApiResult, ErrorDetails};
use crate::storage::TokenStore;
use crate::transport::{HttpRequest, HttpTransport, Method, RequestBody};

/// Standard response wrapper: `{ "success": bool, "message": str?, "data": T? }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    /// The `data` payload; a missing payload is an unexpected response.
    pub fn into_data(self) -> ApiResult<T> {
        self.data
            .ok_or_else(|| ApiError::Unexpected("response is missing its data payload".to_string()))
    }
}

/// Generic REST client: resolves URLs against the API origin, attaches the
/// stored token, strips it on 401, and normalizes every failure into [`ApiError`].
pub struct ApiClient<T> {
    transport: T,
    tokens: Rc<dyn TokenStore>,
    config: ClientConfig,
    unauthorized_hooks: RefCell<Vec<Box<dyn Fn()>>>,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, tokens: Rc<dyn TokenStore>, config: ClientConfig) -> Self {
        Self { transport, tokens, config, unauthorized_hooks: RefCell::new(Vec::new()) }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.token()
    }

    pub fn store_token(&self, token: &str) {
        self.tokens.set_token(token);
    }

    pub fn clear_token(&self) {
        self.tokens.clear_token();
    }

    /// Registers a callback run after any 401 response, once the token is gone.
    pub fn on_unauthorized(&self, hook: impl Fn() + 'static) {
        self.unauthorized_hooks.borrow_mut().push(Box::new(hook));
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<R>> {
        self.send(Method::Get, path, RequestBody::Empty).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Envelope<R>> {
        self.send(Method::Post, path, json_body(body)?).await
    }

    pub async fn put<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<Envelope<R>> {
        self.send(Method::Put, path, json_body(body)?).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> ApiResult<Envelope<R>> {
        self.send(Method::Delete, path, RequestBody::Empty).await
    }

    /// A call whose only payload is the server's confirmation message.
    pub(crate) async fn action(&self, method: Method, path: &str) -> ApiResult<Option<String>> {
        let envelope = self.send::<serde_json::Value>(method, path, RequestBody::Empty).await?;
        Ok(envelope.message)
    }

    /// Sends one request and decodes the envelope. A `success: false` envelope
    /// with a 2xx status is reported as a server error.
    pub async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> ApiResult<Envelope<R>> {
        let request = HttpRequest {
            method,
            url: self.config.api_url(path),
            authorization: self.tokens.token().map(|t| format!("Token {t}")),
            body,
        };
        debug!(%method, url = %request.url, "Sending API request");

        let response = self.transport.execute(request).await.map_err(|e| {
            warn!(%method, path, error = %e, "API request did not reach the server");
            ApiError::network(e.to_string())
        })?;

        if response.status == 401 {
            warn!(%method, path, "API request unauthorized, dropping stored token");
            self.tokens.clear_token();
            self.notify_unauthorized();
            return Err(normalize_error(response.status, &response.body));
        }

        if !response.is_success() {
            let err = normalize_error(response.status, &response.body);
            warn!(%method, path, status = response.status, error = %err, "API request failed");
            return Err(err);
        }

        let envelope: Envelope<R> = serde_json::from_str(&response.body).map_err(|e| {
            warn!(%method, path, error = %e, "Failed to decode API response");
            ApiError::Unexpected(format!("Failed to decode response from {path}: {e}"))
        })?;

        if !envelope.success {
            let message = envelope
                .message
                .clone()
                .unwrap_or_else(|| "Request was rejected".to_string());
            return Err(ApiError::Server(ErrorDetails::new(message, response.status)));
        }
        Ok(envelope)
    }

    fn notify_unauthorized(&self) {
        for hook in self.unauthorized_hooks.borrow().iter() {
            hook();
        }
    }
}

fn json_body<B: Serialize>(body: &B) -> ApiResult<RequestBody> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::Unexpected(format!("Failed to encode request body: {e}")))
}
