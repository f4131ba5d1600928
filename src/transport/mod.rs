//! Transport layer: one HTTP client that carries the session cookie for every call
//! and fails only with a `ClassifiedError`.
//!
//! The cookie itself is opaque. It is set and cleared by the server and stored in the
//! client's cookie jar; nothing here reads or writes it.

pub mod classify;

use anyhow::Context;
use futures_util::future::BoxFuture;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AppResult, ClassifiedError};

pub use reqwest::Method;

/// Request/response pipeline used by the session store and business calls.
pub trait Transport: Send + Sync {
    /// Send a request and return the unwrapped payload.
    fn send<'a>(&'a self, method: Method, path: &'a str, body: Option<Value>) -> BoxFuture<'a, AppResult<Value>>;
}

#[derive(Clone)]
pub struct HttpTransport {
    base: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        Url::parse(&cfg.api_url).with_context(|| format!("invalid API base URL: {}", cfg.api_url))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(cfg.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base: cfg.api_url.trim_end_matches('/').to_string(), client })
    }

    pub fn base(&self) -> &str { &self.base }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') { format!("{}{}", self.base, path) } else { format!("{}/{}", self.base, path) }
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> AppResult<Value> {
        let url = self.url(path);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(b) = body.as_ref() {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(|e| classify::send_error(&e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| classify::body_error(status.as_u16(), &e))?;
        debug!(target: "transport", %method, path, status = status.as_u16(), "response");
        if status.is_success() {
            classify::unwrap_payload(&text)
        } else {
            Err(classify::classify_response(status.as_u16(), &text))
        }
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, method: Method, path: &'a str, body: Option<Value>) -> BoxFuture<'a, AppResult<Value>> {
        Box::pin(async move {
            let out = self.execute(method.clone(), path, body).await;
            if let Err(e) = &out {
                classify::log_failure(&method, path, e);
            }
            out
        })
    }
}

/// Typed call: serialize the body, send, and decode the payload into `R`.
pub async fn call<T, B, R>(transport: &T, method: Method, path: &str, body: Option<&B>) -> AppResult<R>
where
    T: Transport + ?Sized,
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let body = match body {
        Some(b) => Some(
            serde_json::to_value(b).map_err(|e| ClassifiedError::unknown(None, format!("failed to encode request body: {}", e)))?,
        ),
        None => None,
    };
    let payload = transport.send(method.clone(), path, body).await?;
    serde_json::from_value(payload).map_err(|e| {
        let err = ClassifiedError::unknown(None, format!("unexpected response shape from {}: {}", path, e));
        classify::log_failure(&method, path, &err);
        err
    })
}

pub async fn get_json<T: Transport + ?Sized, R: DeserializeOwned>(transport: &T, path: &str) -> AppResult<R> {
    call::<T, Value, R>(transport, Method::GET, path, None).await
}

pub async fn post_json<T, B, R>(transport: &T, path: &str, body: &B) -> AppResult<R>
where
    T: Transport + ?Sized,
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    call(transport, Method::POST, path, Some(body)).await
}

pub async fn put_json<T, B, R>(transport: &T, path: &str, body: &B) -> AppResult<R>
where
    T: Transport + ?Sized,
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    call(transport, Method::PUT, path, Some(body)).await
}

pub async fn delete<T: Transport + ?Sized>(transport: &T, path: &str) -> AppResult<()> {
    transport.send(Method::DELETE, path, None).await.map(|_| ())
}
