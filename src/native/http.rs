use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::transport::{
    FormPart, HttpRequest, HttpResponse, HttpTransport, Method, RequestBody, TransportError,
};

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if let Some(authorization) = &request.authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError(e.to_string()))?;
        debug!(status, url = %request.url, "Response received");
        Ok(HttpResponse { status, body })
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File { name, file_name, content_type, bytes } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| TransportError(format!("invalid content type {content_type}: {e}")))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}
