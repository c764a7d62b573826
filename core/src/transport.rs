//! `reqwest`-backed executor.
//!
//! Request paths are joined onto `base_url`; default headers (usually the
//! bearer token) are attached to every call. The raw status and body are
//! handed to `parse_response`, so this executor and any host-provided one
//! interpret responses identically.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::{parse_response, HttpExecutor, HttpMethod, HttpRequest, HttpResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
    base_url: Url,
    default_headers: HeaderMap,
}

impl ReqwestExecutor {
    /// Executor for `base_url` (e.g. `https://api.example.com`) with a 30s timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::with_client(base_url, client)
    }

    /// Reuse a preconfigured client (proxies, TLS roots, pools).
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("base url {base_url:?}: {e}")))?;
        Ok(Self {
            client,
            base_url,
            default_headers: HeaderMap::new(),
        })
    }

    pub fn with_default_header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name =
            HeaderName::try_from(name).map_err(|e| ApiError::InvalidConfig(e.to_string()))?;
        let value =
            HeaderValue::try_from(value).map_err(|e| ApiError::InvalidConfig(e.to_string()))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn with_access_token(self, token: &str) -> Result<Self, ApiError> {
        self.with_default_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path);
        let mut builder = self
            .client
            .request(method(request.method), url)
            .headers(self.default_headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        parse_response(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
