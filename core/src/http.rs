//! HTTP transport types and the executor contract.
//!
//! # Design
//! Requests and responses are plain data. The facades build `HttpRequest`
//! values and hand them to an `HttpExecutor`, which owns every transport
//! concern (connection reuse, auth headers, retries, timeouts) and returns
//! the parsed JSON payload. `parse_response` is the shared status/body
//! interpretation that executors apply to a raw `HttpResponse`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is relative to whatever base URL the executor targets. Query pairs
/// keep their order and may repeat a name (`properties=email&properties=phone`).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// First query value for `name`, if any.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes requests against the modern API and returns the JSON payload.
///
/// Implementations reject non-2xx responses with `ApiError::Remote` so the
/// facades can inspect the status code (see `Properties::upsert`).
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<Value, ApiError>;
}

#[async_trait]
impl<E: HttpExecutor + ?Sized> HttpExecutor for std::sync::Arc<E> {
    async fn execute(&self, request: HttpRequest) -> Result<Value, ApiError> {
        (**self).execute(request).await
    }
}

/// Interpret a raw response: 2xx bodies are parsed as JSON (empty bodies
/// become `null`), everything else becomes `ApiError::Remote`.
pub fn parse_response(response: HttpResponse) -> Result<Value, ApiError> {
    if !(200..300).contains(&response.status) {
        return Err(ApiError::Remote {
            status: response.status,
            message: remote_message(&response.body),
        });
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// The remote error envelope carries a `message` field; fall back to the raw body.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
