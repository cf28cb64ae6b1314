//! Thin authenticated JSON adapter over the dashboard backend.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    session::Session,
};

/// Issues JSON requests against the backend. No retries, no caching.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(&self, path: &str, query: &[(&str, String)], cancel: &CancelToken) -> ClientResult<Value>;

    async fn post(&self, path: &str, body: &Value, cancel: &CancelToken) -> ClientResult<Value>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    session: Arc<Session>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self { base_url: base_url.into(), session, http: Client::new() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn send(&self, req: RequestBuilder, path: &str) -> ClientResult<Value> {
        let req = match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        tracing::debug!(path, "sending backend request");

        let res = req.send().await.map_err(|e| ClientError::Network(e.to_string()))?;
        let status = res.status();
        let body = res.text().await.map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Http { status: status.as_u16(), message: truncate_body(&body) });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| ClientError::MalformedResponse(format!("{path}: {e}")))
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get(&self, path: &str, query: &[(&str, String)], cancel: &CancelToken) -> ClientResult<Value> {
        let req = self.http.get(self.url(path)).query(query);
        cancel.run(self.send(req, path)).await
    }

    async fn post(&self, path: &str, body: &Value, cancel: &CancelToken) -> ClientResult<Value> {
        let req = self.http.post(self.url(path)).json(body);
        cancel.run(self.send(req, path)).await
    }
}

/// Strip the backend's `{success, data, message}` envelope.
///
/// `success: false` is reported as a malformed response carrying the
/// backend's message. Payloads without an envelope pass through.
pub fn unwrap_envelope(value: Value) -> ClientResult<Value> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    match map.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let message = map
                .get("message")
                .or_else(|| map.get("detail"))
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            Err(ClientError::MalformedResponse(message.to_string()))
        }
        Some(true) => Ok(map.remove("data").unwrap_or(Value::Object(map))),
        None => Ok(Value::Object(map)),
    }
}

/// Unwrap the envelope and deserialize into `T`.
pub fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ClientResult<T> {
    let inner = unwrap_envelope(value)?;
    serde_json::from_value(inner).map_err(|e| ClientError::MalformedResponse(format!("{what}: {e}")))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
