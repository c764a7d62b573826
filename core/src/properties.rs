//! Contact property definitions and property groups.
//!
//! Definitions have the same shape in both dialects, so payloads pass
//! through untouched. Listing endpoints unwrap the modern `results` envelope
//! because legacy callers received a bare array.

use serde_json::Value;
use tracing::info;

use crate::client::{encode_segment, joined, require, CrmClient};
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest};
use crate::options::PropertyOptions;

pub struct Properties<'a, E> {
    client: &'a CrmClient<E>,
}

impl<'a, E: HttpExecutor> Properties<'a, E> {
    pub(crate) fn new(client: &'a CrmClient<E>) -> Self {
        Self { client }
    }

    fn definitions(&self, suffix: &str) -> String {
        self.client.path(&format!("/properties/contacts{suffix}"))
    }

    fn named(&self, name: &str) -> Result<String, ApiError> {
        let name = require(name, "name")?;
        Ok(self.definitions(&format!("/{}", encode_segment(name))))
    }

    fn group(&self, name: &str) -> Result<String, ApiError> {
        let name = require(name, "name")?;
        Ok(self.definitions(&format!("/groups/{}", encode_segment(name))))
    }

    pub fn build_get_all(&self, options: &PropertyOptions) -> HttpRequest {
        let mut request = HttpRequest::get(self.definitions(""));
        if let Some(archived) = options.archived {
            request = request.with_query("archived", archived.to_string());
        }
        if let Some(properties) = joined(&options.properties) {
            request = request.with_query("properties", properties);
        }
        request
    }

    pub async fn get_all(&self, options: &PropertyOptions) -> Result<Value, ApiError> {
        let response = self.client.send(self.build_get_all(options)).await?;
        Ok(unwrap_results(response))
    }

    pub async fn get(&self, options: &PropertyOptions) -> Result<Value, ApiError> {
        self.get_all(options).await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Value, ApiError> {
        self.client.send(HttpRequest::get(self.named(name)?)).await
    }

    pub fn build_create(&self, data: Value) -> HttpRequest {
        HttpRequest::post(self.definitions("")).with_body(data)
    }

    pub async fn create(&self, data: Value) -> Result<Value, ApiError> {
        self.client.send(self.build_create(data)).await
    }

    pub fn build_update(&self, name: &str, data: Value) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::patch(self.named(name)?).with_body(data))
    }

    pub async fn update(&self, name: &str, data: Value) -> Result<Value, ApiError> {
        self.client.send(self.build_update(name, data)?).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), ApiError> {
        self.client.send(HttpRequest::delete(self.named(name)?)).await?;
        Ok(())
    }

    /// Create the property, or update it when the remote reports that it
    /// already exists. Exactly one fallback attempt; any other failure is
    /// returned as-is.
    pub async fn upsert(&self, data: Value) -> Result<Value, ApiError> {
        match self.create(data.clone()).await {
            Err(err) if err.is_conflict() => {
                let name = data
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or(ApiError::MissingArgument("name"))?
                    .to_string();
                info!(property = %name, "property exists, updating instead");
                self.update(&name, data).await
            }
            other => other,
        }
    }

    pub async fn get_groups(&self) -> Result<Value, ApiError> {
        let response = self
            .client
            .send(HttpRequest::get(self.definitions("/groups")))
            .await?;
        Ok(unwrap_results(response))
    }

    pub async fn create_group(&self, data: Value) -> Result<Value, ApiError> {
        self.client
            .send(HttpRequest::post(self.definitions("/groups")).with_body(data))
            .await
    }

    pub async fn update_group(&self, name: &str, data: Value) -> Result<Value, ApiError> {
        self.client
            .send(HttpRequest::patch(self.group(name)?).with_body(data))
            .await
    }

    pub async fn delete_group(&self, name: &str) -> Result<(), ApiError> {
        self.client.send(HttpRequest::delete(self.group(name)?)).await?;
        Ok(())
    }
}

/// `{results: [...]}` becomes the bare array; other payloads are returned as-is.
fn unwrap_results(response: Value) -> Value {
    match response {
        Value::Object(mut body) if body.get("results").is_some_and(Value::is_array) => {
            body.remove("results").unwrap_or_default()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::http::HttpMethod;
    use crate::mock::MockExecutor;

    const PROPERTIES: &str = "/crm/v3/properties/contacts";

    fn definition() -> Value {
        json!({
            "name": "favorite_color",
            "label": "Favorite color",
            "groupName": "contactinformation"
        })
    }

    #[tokio::test]
    async fn get_all_unwraps_results() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Get,
            PROPERTIES,
            json!({"results": [{"name": "email"}]}),
        );
        let client = CrmClient::new(executor);
        let all = client.properties().get_all(&PropertyOptions::default()).await.unwrap();
        assert_eq!(all, json!([{"name": "email"}]));
    }

    #[test]
    fn build_get_all_sends_archived_flag() {
        let client = CrmClient::new(MockExecutor::new());
        let req = client.properties().build_get_all(&PropertyOptions {
            archived: Some(true),
            properties: Vec::new(),
        });
        assert_eq!(req.query_value("archived"), Some("true"));
    }

    #[tokio::test]
    async fn upsert_creates_when_absent() {
        let executor = MockExecutor::new().respond(HttpMethod::Post, PROPERTIES, definition());
        let client = CrmClient::new(executor);
        let created = client.properties().upsert(definition()).await.unwrap();
        assert_eq!(created["name"], "favorite_color");
        assert_eq!(client.executor().recorded().len(), 1);
    }

    #[tokio::test]
    async fn upsert_falls_back_to_update_on_conflict() {
        let mut updated = definition();
        updated["description"] = json!("updated");
        let executor = MockExecutor::new()
            .fail(HttpMethod::Post, PROPERTIES, 409, "Property already exists")
            .respond(
                HttpMethod::Patch,
                "/crm/v3/properties/contacts/favorite_color",
                updated.clone(),
            );
        let client = CrmClient::new(executor);
        let result = client.properties().upsert(definition()).await.unwrap();
        assert_eq!(result, updated);

        let recorded = client.executor().recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[1].method, HttpMethod::Patch);
        assert_eq!(recorded[1].body.as_ref(), Some(&definition()));
    }

    #[tokio::test]
    async fn upsert_surfaces_other_errors_without_update() {
        let executor =
            MockExecutor::new().fail(HttpMethod::Post, PROPERTIES, 400, "bad definition");
        let client = CrmClient::new(executor);
        let err = client.properties().upsert(definition()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(client.executor().recorded().len(), 1);
    }

    #[tokio::test]
    async fn conflict_without_name_is_a_caller_error() {
        let executor = MockExecutor::new().fail(HttpMethod::Post, PROPERTIES, 409, "exists");
        let client = CrmClient::new(executor);
        let err = client.properties().upsert(json!({"label": "x"})).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingArgument("name")));
    }

    #[tokio::test]
    async fn group_paths() {
        let executor = MockExecutor::new()
            .respond(
                HttpMethod::Get,
                "/crm/v3/properties/contacts/groups",
                json!({"results": []}),
            )
            .respond(
                HttpMethod::Delete,
                "/crm/v3/properties/contacts/groups/my%20group",
                Value::Null,
            );
        let client = CrmClient::new(executor);
        assert_eq!(client.properties().get_groups().await.unwrap(), json!([]));
        client.properties().delete_group("my group").await.unwrap();
        assert!(client.properties().delete_group("").await.is_err());
    }

    #[test]
    fn unwrap_results_leaves_other_shapes() {
        assert_eq!(unwrap_results(json!({"name": "x"})), json!({"name": "x"}));
        assert_eq!(unwrap_results(json!([1])), json!([1]));
    }
}
