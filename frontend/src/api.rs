use async_trait::async_trait;
use gloo_net::http::Request;
use js_sys::{Array, Uint8Array};
use serde_json::Value;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, File, FormData, UrlSearchParams};

use testgen_core::api::{ApiRequest, Body, FileUpload, Method, RestBackend, Transport};
use testgen_core::auth::{FirebaseAuth, IDENTITY_TOOLKIT_BASE};
use testgen_core::{AppError, Result};

/// Base URL of the agent backend, fixed at build time.
pub const API_BASE: &str = match option_env!("AGENT_API_BASE") {
    Some(base) => base,
    None => "http://127.0.0.1:8000",
};

/// Web API key of the Firebase project. Without it the app runs signed out
/// under a generated local user id.
pub const FIREBASE_API_KEY: Option<&str> = option_env!("FIREBASE_API_KEY");

pub type Backend = RestBackend<GlooTransport>;
pub type Identity = FirebaseAuth<GlooTransport>;

pub fn backend() -> Backend {
    RestBackend::new(GlooTransport::new(API_BASE))
}

pub fn identity() -> Option<Identity> {
    FIREBASE_API_KEY.map(|key| FirebaseAuth::new(GlooTransport::new(IDENTITY_TOOLKIT_BASE), key))
}

/// [`Transport`] over the browser's `fetch`.
#[derive(Debug, Clone)]
pub struct GlooTransport {
    base: String,
}

impl GlooTransport {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into().trim_end_matches('/').to_string() }
    }
}

fn network(err: gloo_net::Error) -> AppError {
    AppError::network(err.to_string())
}

fn js_error(context: &str, err: JsValue) -> AppError {
    AppError::network(format!("{context}: {err:?}"))
}

fn form_body(fields: &[(String, String)]) -> Result<UrlSearchParams> {
    let params = UrlSearchParams::new().map_err(|e| js_error("form body", e))?;
    for (name, value) in fields {
        params.append(name, value);
    }
    Ok(params)
}

fn multipart_body(fields: &[(String, String)], file: &FileUpload) -> Result<FormData> {
    let form = FormData::new().map_err(|e| js_error("multipart body", e))?;
    for (name, value) in fields {
        form.append_with_str(name, value).map_err(|e| js_error("multipart field", e))?;
    }
    let bytes = Uint8Array::from(file.bytes.as_slice());
    let options = BlobPropertyBag::new();
    if let Some(mime) = &file.mime {
        options.set_type(mime);
    }
    let blob = Blob::new_with_u8_array_sequence_and_options(&Array::of1(&bytes), &options)
        .map_err(|e| js_error("file blob", e))?;
    form.append_with_blob_and_filename("file", &blob, &file.filename)
        .map_err(|e| js_error("multipart file", e))?;
    Ok(form)
}

#[async_trait(?Send)]
impl Transport for GlooTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = format!("{}{}", self.base, request.path);
        log::debug!("{:?} {url}", request.method);

        let mut builder = match request.method {
            Method::Get => Request::get(&url),
            Method::Post => Request::post(&url),
            Method::Patch => Request::patch(&url),
            Method::Delete => Request::delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        let sent = match request.body {
            Body::Empty => builder.send().await,
            Body::Json(body) => builder.json(&body).map_err(network)?.send().await,
            Body::Form(fields) => builder.body(form_body(&fields)?).map_err(network)?.send().await,
            Body::Multipart { fields, file } => {
                builder.body(multipart_body(&fields, &file)?).map_err(network)?.send().await
            }
        };

        let response = sent.map_err(network)?;
        let status = response.status();
        let text = response.text().await.map_err(network)?;
        if !(200..300).contains(&status) {
            log::debug!("{url} answered {status}");
            return Err(AppError::Http { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| AppError::decode(url, e))
    }
}

/// Reads a picked file into an upload.
pub async fn read_file(file: &File) -> Result<FileUpload> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| js_error("reading file", e))?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    let mime = Some(file.type_()).filter(|m| !m.is_empty());
    Ok(FileUpload { filename: file.name(), mime, bytes })
}

/// Takes the `code` Jira appended when redirecting back after consent, and
/// strips it from the address bar so a reload does not replay it.
pub fn take_jira_callback_code() -> Option<String> {
    let window = web_sys::window()?;
    let location = window.location();
    let params = UrlSearchParams::new_with_str(&location.search().ok()?).ok()?;
    let code = params.get("code").filter(|c| !c.is_empty())?;
    if let (Ok(history), Ok(path)) = (window.history(), location.pathname()) {
        let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&path));
    }
    Some(code)
}

pub fn navigate(url: &str) {
    if let Some(window) = web_sys::window() {
        if let Err(e) = window.location().set_href(url) {
            log::error!("Could not open {url}: {e:?}");
        }
    }
}
