//! Owners facade. The legacy call returned every owner at once, so `get`
//! follows the modern cursor until the remote stops handing one out.

use serde_json::Value;
use tracing::debug;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest};
use crate::options::OwnerOptions;
use crate::types::ModernPage;

pub struct Owners<'a, E> {
    client: &'a CrmClient<E>,
}

impl<'a, E: HttpExecutor> Owners<'a, E> {
    pub(crate) fn new(client: &'a CrmClient<E>) -> Self {
        Self { client }
    }

    pub fn build_get(&self, options: &OwnerOptions, after: Option<&str>) -> HttpRequest {
        let mut request = HttpRequest::get(self.client.path("/owners"));
        if let Some(email) = options.email.as_deref() {
            request = request.with_query("email", email);
        }
        if let Some(limit) = options.limit {
            request = request.with_query("limit", limit.to_string());
        }
        if let Some(archived) = options.archived {
            request = request.with_query("archived", archived.to_string());
        }
        if let Some(after) = after {
            request = request.with_query("after", after);
        }
        request
    }

    /// Every owner, across as many pages as the remote returns. Pages are
    /// fetched one after another since each cursor comes from the previous
    /// response.
    pub async fn get(&self, options: &OwnerOptions) -> Result<Vec<Value>, ApiError> {
        let mut owners = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let page: ModernPage<Value> = self
                .client
                .send_as(self.build_get(options, after.as_deref()))
                .await?;
            let next = page
                .next_after()
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            owners.extend(page.results);
            match next {
                Some(next) if after.as_deref() != Some(next.as_str()) => after = Some(next),
                _ => break,
            }
            debug!(fetched = owners.len(), "fetching next owners page");
        }
        Ok(owners)
    }
}
