//! I/O seams of the client. The managers only talk to the outside world
//! through these traits, so the same state core runs in the browser, natively,
//! and against in-memory fakes.

use std::fmt;

use crate::errors::SocketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file_name: String, content_type: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// A fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Value of the `Authorization` header, if any.
    pub authorization: Option<String>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before any response arrived (DNS, refused connection, timeout...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TransportError {}

/// Executes HTTP requests. Implementations are free to return `!Send` futures.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ── Sockets ──────────────────────────────────────────────────────────────────

/// Which manager a socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    Presence,
    Notifications,
    Conversation,
}

/// Identifies one socket connection. Events carrying an outdated generation
/// belong to a superseded connection and must be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionTag {
    pub role: SocketRole,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    Text(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// An open (or opening) socket. Dropping it does not close it; call `close`.
pub trait ChatSocket {
    fn send_text(&self, text: String) -> Result<(), SocketError>;
    fn close(&self);
}

/// Opens sockets. Every event of the returned socket must be delivered back to
/// the owner together with `tag`, and never synchronously from inside `connect`.
pub trait SocketConnector {
    type Socket: ChatSocket + 'static;

    fn connect(&self, url: &str, tag: ConnectionTag) -> Result<Self::Socket, SocketError>;
}
