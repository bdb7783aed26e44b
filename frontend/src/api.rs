use gloo_net::http::Request;
use js_sys::{Array, Uint8Array};
use web_sys::{Blob, BlobPropertyBag, FormData};

use neurocom_client::transport::{FormPart, Method, RequestBody};
use neurocom_client::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// [`HttpTransport`] over the browser's `fetch`, via gloo-net.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTransport;

impl HttpTransport for GlooTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => Request::get(&request.url),
            Method::Post => Request::post(&request.url),
            Method::Put => Request::put(&request.url),
            Method::Delete => Request::delete(&request.url),
        };
        if let Some(authorization) = &request.authorization {
            builder = builder.header("Authorization", authorization);
        }

        let built = match request.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.body(form_data(parts)?),
        }
        .map_err(|e| TransportError(format!("Request error: {e}")))?;

        let resp = built
            .send()
            .await
            .map_err(|e| TransportError(format!("Network error: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(format!("Read error: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

fn form_data(parts: Vec<FormPart>) -> Result<FormData, TransportError> {
    let js_err = |e: wasm_bindgen::JsValue| TransportError(format!("Form error: {e:?}"));
    let form = FormData::new().map_err(js_err)?;
    for part in parts {
        match part {
            FormPart::Text { name, value } => form.append_with_str(&name, &value).map_err(js_err)?,
            FormPart::File { name, file_name, content_type, bytes } => {
                let chunks = Array::of1(&Uint8Array::from(bytes.as_slice()));
                let options = BlobPropertyBag::new();
                options.set_type(&content_type);
                let blob = Blob::new_with_u8_array_sequence_and_options(&chunks, &options)
                    .map_err(js_err)?;
                form.append_with_blob_and_filename(&name, &blob, &file_name)
                    .map_err(js_err)?;
            }
        }
    }
    Ok(form)
}
