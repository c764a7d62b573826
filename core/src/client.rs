//! Entry point: a legacy-dialect client over the modern REST surface.
//!
//! # Design
//! `CrmClient` owns an `HttpExecutor` and a validated `CompatConfig` and
//! carries no other state between calls. Resource facades (`contacts()`,
//! `properties()`, `lists()`, `owners()`) borrow the client. Each facade
//! operation is split into a pure `build_*` method that produces the modern
//! `HttpRequest` and an async method that sends it and translates the
//! response back to the legacy dialect.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::CompatConfig;
use crate::contacts::Contacts;
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest};
use crate::lists::Lists;
use crate::owners::Owners;
use crate::properties::Properties;

#[derive(Debug, Clone)]
pub struct CrmClient<E> {
    executor: E,
    config: CompatConfig,
}

impl<E: HttpExecutor> CrmClient<E> {
    /// Client with the default configuration.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            config: CompatConfig::default(),
        }
    }

    pub fn with_config(executor: E, config: CompatConfig) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self { executor, config })
    }

    pub fn config(&self) -> &CompatConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn contacts(&self) -> Contacts<'_, E> {
        Contacts::new(self)
    }

    pub fn properties(&self) -> Properties<'_, E> {
        Properties::new(self)
    }

    pub fn lists(&self) -> Lists<'_, E> {
        Lists::new(self)
    }

    pub fn owners(&self) -> Owners<'_, E> {
        Owners::new(self)
    }

    /// Modern path under the configured base path.
    pub(crate) fn path(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.config.normalized_base_path())
    }

    pub(crate) async fn send(&self, request: HttpRequest) -> Result<Value, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "modern request");
        self.executor.execute(request).await
    }

    pub(crate) async fn send_as<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, ApiError> {
        decode(self.send(request).await?)
    }
}

/// Deserialize a response payload; `null` (no content) reads as `{}`.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Percent-encode one path segment (spaces as `%20`, not `+`).
pub(crate) fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Reject an empty identifier before any request is built.
pub(crate) fn require<'s>(value: &'s str, name: &'static str) -> Result<&'s str, ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::MissingArgument(name));
    }
    Ok(value)
}

/// Comma-joined property names for query strings, `None` when empty.
pub(crate) fn joined(properties: &[String]) -> Option<String> {
    (!properties.is_empty()).then(|| properties.join(","))
}
