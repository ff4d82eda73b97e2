use gloo_net::http::{Request, RequestBuilder, Response};
use memeshare_shared::ImageUpload;
use memeshare_sync::{Error, Result};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use web_sys::js_sys::{Array, Uint8Array};
use web_sys::{window, Blob, BlobPropertyBag, FormData};

const TOKEN_KEY: &str = "memeshare_token";

fn api_base() -> String {
    // Read from a meta tag set by the page, falling back to localhost for dev
    let meta = window()
        .and_then(|w| w.document())
        .and_then(|d| d.query_selector("meta[name='memeshare-api']").ok().flatten())
        .and_then(|el| el.get_attribute("content"));
    match meta {
        Some(url) if !url.is_empty() => url,
        _ => "http://localhost:8080".to_string(),
    }
}

fn get_token() -> Option<String> {
    window()?
        .local_storage()
        .ok()??
        .get_item(TOKEN_KEY)
        .ok()?
}

/// Renders a thrown JS value for an error message.
pub fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn authorized(req: RequestBuilder) -> RequestBuilder {
    match get_token() {
        Some(token) => req.header("Authorization", &format!("Bearer {}", token)),
        None => req,
    }
}

pub fn get_request(path: &str) -> RequestBuilder {
    authorized(Request::get(&format!("{}{}", api_base(), path)))
}

pub fn post_request(path: &str) -> RequestBuilder {
    authorized(Request::post(&format!("{}{}", api_base(), path)))
}

pub fn put_request(path: &str) -> RequestBuilder {
    authorized(Request::put(&format!("{}{}", api_base(), path)))
}

pub fn delete_request(path: &str) -> RequestBuilder {
    authorized(Request::delete(&format!("{}{}", api_base(), path)))
}

async fn check(resp: Response) -> Result<Response> {
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let message = resp.text().await.ok().filter(|text| !text.trim().is_empty());
    Err(Error::Status { status, message })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json().await.map_err(|e| Error::Decode(e.to_string()))
}

/// Sends a request without a body and decodes the JSON answer.
pub async fn fetch<T: DeserializeOwned>(req: RequestBuilder) -> Result<T> {
    let resp = req
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    decode(check(resp).await?).await
}

/// Sends a request without a body, ignoring the answer's content.
pub async fn execute(req: RequestBuilder) -> Result<()> {
    let resp = req
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    check(resp).await.map(drop)
}

/// Sends a multipart body. The browser sets the boundary header itself.
pub async fn submit<T: DeserializeOwned>(req: RequestBuilder, form: Form) -> Result<T> {
    let req = req
        .body(form.0)
        .map_err(|e| Error::Encode(e.to_string()))?;
    let resp = req
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    decode(check(resp).await?).await
}

/// `multipart/form-data` body under construction.
pub struct Form(FormData);

impl Form {
    pub fn new() -> Result<Self> {
        FormData::new()
            .map(Self)
            .map_err(|e| Error::Encode(js_error(e)))
    }

    pub fn text(&self, name: &str, value: &str) -> Result<()> {
        self.0
            .append_with_str(name, value)
            .map_err(|e| Error::Encode(js_error(e)))
    }

    pub fn file(&self, name: &str, upload: &ImageUpload) -> Result<()> {
        let bytes = Uint8Array::from(upload.data.as_slice());
        let options = BlobPropertyBag::new();
        options.set_type(&upload.content_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&Array::of1(&bytes), &options)
            .map_err(|e| Error::Encode(js_error(e)))?;
        self.0
            .append_with_blob_and_filename(name, &blob, &upload.file_name)
            .map_err(|e| Error::Encode(js_error(e)))
    }
}
