//! In-crate transport double for façade tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    cancel::CancelToken,
    error::{ClientError, ClientResult},
    http::Transport,
};

#[derive(Debug, Clone)]
enum Canned {
    Ok(Value),
    Status(u16),
    Offline,
}

impl Canned {
    fn respond(&self) -> ClientResult<Value> {
        match self {
            Canned::Ok(v) => Ok(v.clone()),
            Canned::Status(status) => {
                Err(ClientError::Http { status: *status, message: "stubbed failure".into() })
            }
            Canned::Offline => Err(ClientError::Network("connection refused".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct StubTransport {
    routes: HashMap<String, Canned>,
    unmatched: Canned,
    calls: Mutex<Vec<Call>>,
}

impl StubTransport {
    /// Unknown paths answer 404.
    pub fn new() -> Self {
        Self { routes: HashMap::new(), unmatched: Canned::Status(404), calls: Mutex::new(Vec::new()) }
    }

    /// Every path answers with `status`.
    pub fn failing(status: u16) -> Self {
        Self { unmatched: Canned::Status(status), ..Self::new() }
    }

    pub fn offline() -> Self {
        Self { unmatched: Canned::Offline, ..Self::new() }
    }

    pub fn with_ok(mut self, path: &str, body: Value) -> Self {
        self.routes.insert(path.to_string(), Canned::Ok(body));
        self
    }

    pub fn with_status(mut self, path: &str, status: u16) -> Self {
        self.routes.insert(path.to_string(), Canned::Status(status));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn answer(&self, call: Call) -> ClientResult<Value> {
        let canned = self.routes.get(&call.path).unwrap_or(&self.unmatched).clone();
        self.calls.lock().push(call);
        canned.respond()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path: &str, query: &[(&str, String)], cancel: &CancelToken) -> ClientResult<Value> {
        let call = Call {
            method: "GET",
            path: path.to_string(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            body: None,
        };
        cancel.run(async { self.answer(call) }).await
    }

    async fn post(&self, path: &str, body: &Value, cancel: &CancelToken) -> ClientResult<Value> {
        let call = Call { method: "POST", path: path.to_string(), query: Vec::new(), body: Some(body.clone()) };
        cancel.run(async { self.answer(call) }).await
    }
}

/// Sorted top-level keys of a serialized value.
pub(crate) fn keys_of<T: serde::Serialize>(value: &T) -> Vec<String> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            keys
        }
        _ => Vec::new(),
    }
}
