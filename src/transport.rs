use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use testgen_core::api::{ApiRequest, Body, Method, Transport};
use testgen_core::{AppError, Result};

/// [`Transport`] over `reqwest`, rooted at one base URL.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: String,
}

impl ReqwestTransport {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { client, base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn network(err: reqwest::Error) -> AppError {
    AppError::network(err.to_string())
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = format!("{}{}", self.base, request.path);
        debug!(method = ?request.method, %url, "request");

        let mut builder = self.client.request(method(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(&body),
            Body::Form(fields) => builder.form(&fields),
            Body::Multipart { fields, file } => {
                let mut part = Part::bytes(file.bytes).file_name(file.filename);
                if let Some(mime) = file.mime {
                    part = part.mime_str(&mime).map_err(network)?;
                }
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value))
                    .part("file", part);
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(network)?;
        let status = response.status();
        let text = response.text().await.map_err(network)?;
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "request failed");
            return Err(AppError::Http { status: status.as_u16(), body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AppError::decode(url, e))
    }
}
