//! Contacts facade: the legacy contacts surface over `/objects/contacts`.

use serde_json::{json, Value};

use crate::client::{encode_segment, joined, require, CrmClient};
use crate::collection::{modern_list_response_to_legacy, modern_search_response_to_legacy};
use crate::entity::{
    legacy_batch_item_to_modern, legacy_properties_to_modern_request, modern_batch_to_legacy_map,
    modern_contact_to_legacy,
};
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest};
use crate::options::{ContactPageOptions, SearchOptions};
use crate::ordered::OrderedMap;
use crate::types::{LegacyContact, LegacyContactPage, LegacySearchPage, ModernContact, ModernPage};

/// Sort property of the recently-modified listing.
pub const LAST_MODIFIED_PROPERTY: &str = "lastmodifieddate";
/// Sort property of the recently-created listing.
pub const CREATED_PROPERTY: &str = "createdate";

pub struct Contacts<'a, E> {
    client: &'a CrmClient<E>,
}

impl<'a, E: HttpExecutor> Contacts<'a, E> {
    pub(crate) fn new(client: &'a CrmClient<E>) -> Self {
        Self { client }
    }

    fn objects(&self, suffix: &str) -> String {
        self.client.path(&format!("/objects/contacts{suffix}"))
    }

    pub fn build_get(&self, options: &ContactPageOptions) -> HttpRequest {
        let mut request = HttpRequest::get(self.objects(""));
        if let Some(count) = options.count {
            request = request.with_query("limit", count.to_string());
        }
        if let Some(after) = options.vid_offset.as_deref().filter(|a| !a.is_empty()) {
            request = request.with_query("after", after);
        }
        if let Some(properties) = joined(&options.properties) {
            request = request.with_query("properties", properties);
        }
        request
    }

    /// One page of contacts.
    pub async fn get(&self, options: &ContactPageOptions) -> Result<LegacyContactPage, ApiError> {
        let page: ModernPage<ModernContact> = self.client.send_as(self.build_get(options)).await?;
        Ok(modern_list_response_to_legacy(page))
    }

    pub async fn get_all(
        &self,
        options: &ContactPageOptions,
    ) -> Result<LegacyContactPage, ApiError> {
        self.get(options).await
    }

    /// Search request sorted descending by `sort_property`.
    pub fn build_recent(&self, sort_property: &str, options: &ContactPageOptions) -> HttpRequest {
        let mut body = json!({
            "sorts": [{"propertyName": sort_property, "direction": "DESCENDING"}],
            "limit": options.count.unwrap_or(self.client.config().default_page_size),
        });
        if let Some(after) = options.vid_offset.as_deref().filter(|a| !a.is_empty()) {
            body["after"] = json!(after);
        }
        if !options.properties.is_empty() {
            body["properties"] = json!(options.properties);
        }
        HttpRequest::post(self.objects("/search")).with_body(body)
    }

    pub async fn get_recently_modified(
        &self,
        options: &ContactPageOptions,
    ) -> Result<LegacyContactPage, ApiError> {
        let request = self.build_recent(LAST_MODIFIED_PROPERTY, options);
        let page: ModernPage<ModernContact> = self.client.send_as(request).await?;
        Ok(modern_list_response_to_legacy(page))
    }

    pub async fn get_recently_created(
        &self,
        options: &ContactPageOptions,
    ) -> Result<LegacyContactPage, ApiError> {
        let request = self.build_recent(CREATED_PROPERTY, options);
        let page: ModernPage<ModernContact> = self.client.send_as(request).await?;
        Ok(modern_list_response_to_legacy(page))
    }

    pub fn build_get_by_email(&self, email: &str) -> Result<HttpRequest, ApiError> {
        let email = require(email, "email")?;
        Ok(HttpRequest::get(self.objects(&format!("/{}", encode_segment(email))))
            .with_query("idProperty", "email"))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<LegacyContact, ApiError> {
        let contact: ModernContact = self.client.send_as(self.build_get_by_email(email)?).await?;
        Ok(modern_contact_to_legacy(contact))
    }

    pub fn build_get_by_email_batch<T: AsRef<str>>(
        &self,
        emails: &[T],
    ) -> Result<HttpRequest, ApiError> {
        if emails.is_empty() {
            return Err(ApiError::MissingArgument("emails"));
        }
        let inputs: Vec<Value> = emails.iter().map(|e| json!({"id": e.as_ref()})).collect();
        Ok(HttpRequest::post(self.objects("/batch/read"))
            .with_body(json!({"idProperty": "email", "inputs": inputs})))
    }

    /// Contacts keyed by `vid`, in response order.
    pub async fn get_by_email_batch<T: AsRef<str>>(
        &self,
        emails: &[T],
    ) -> Result<OrderedMap<LegacyContact>, ApiError> {
        let page: ModernPage<ModernContact> =
            self.client.send_as(self.build_get_by_email_batch(emails)?).await?;
        modern_batch_to_legacy_map(page.results, self.client.config().batch_key_collision)
    }

    pub fn build_get_by_id(&self, id: &str) -> Result<HttpRequest, ApiError> {
        let id = require(id, "id")?;
        Ok(HttpRequest::get(self.objects(&format!("/{}", encode_segment(id)))))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<LegacyContact, ApiError> {
        let contact: ModernContact = self.client.send_as(self.build_get_by_id(id)?).await?;
        Ok(modern_contact_to_legacy(contact))
    }

    pub fn build_get_by_id_batch<T: ToString>(&self, ids: &[T]) -> Result<HttpRequest, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::MissingArgument("ids"));
        }
        let inputs: Vec<Value> = ids.iter().map(|id| json!({"id": id.to_string()})).collect();
        Ok(HttpRequest::post(self.objects("/batch/read")).with_body(json!({"inputs": inputs})))
    }

    pub async fn get_by_id_batch<T: ToString>(
        &self,
        ids: &[T],
    ) -> Result<OrderedMap<LegacyContact>, ApiError> {
        let page: ModernPage<ModernContact> =
            self.client.send_as(self.build_get_by_id_batch(ids)?).await?;
        modern_batch_to_legacy_map(page.results, self.client.config().batch_key_collision)
    }

    /// The user-token profile lookup has no modern counterpart; it still
    /// targets the legacy endpoint and returns its payload untouched.
    pub fn build_get_by_token(&self, token: &str) -> Result<HttpRequest, ApiError> {
        let token = require(token, "token")?;
        Ok(HttpRequest::get(format!(
            "/contacts/v1/contact/utk/{}/profile",
            encode_segment(token)
        )))
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Value, ApiError> {
        self.client.send(self.build_get_by_token(token)?).await
    }

    pub fn build_delete(&self, id: &str) -> Result<HttpRequest, ApiError> {
        let id = require(id, "id")?;
        Ok(HttpRequest::delete(self.objects(&format!("/{}", encode_segment(id)))))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.send(self.build_delete(id)?).await?;
        Ok(())
    }

    pub fn build_update(&self, id: &str, data: Value) -> Result<HttpRequest, ApiError> {
        let id = require(id, "id")?;
        Ok(HttpRequest::patch(self.objects(&format!("/{}", encode_segment(id))))
            .with_body(legacy_properties_to_modern_request(data)))
    }

    /// Legacy updates answered with no content; the modern record is discarded.
    pub async fn update(&self, id: &str, data: Value) -> Result<(), ApiError> {
        self.client.send(self.build_update(id, data)?).await?;
        Ok(())
    }

    pub fn build_create(&self, data: Value) -> HttpRequest {
        HttpRequest::post(self.objects("")).with_body(legacy_properties_to_modern_request(data))
    }

    pub async fn create(&self, data: Value) -> Result<LegacyContact, ApiError> {
        let contact: ModernContact = self.client.send_as(self.build_create(data)).await?;
        Ok(modern_contact_to_legacy(contact))
    }

    /// Single-record batch upsert keyed by email. The remote reads the match
    /// key from the properties, so `email` is written there as well as into
    /// the top-level id.
    pub fn build_create_or_update(
        &self,
        email: &str,
        data: Value,
    ) -> Result<HttpRequest, ApiError> {
        let email = require(email, "email")?;
        let mut input = match legacy_properties_to_modern_request(data) {
            Value::Object(fields) => fields,
            _ => Default::default(),
        };
        let properties = input
            .entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
        if !properties.is_object() {
            *properties = Value::Object(Default::default());
        }
        if let Value::Object(props) = properties {
            props.insert("email".to_string(), json!(email));
        }
        input.insert("id".to_string(), json!(email));
        input.insert("idProperty".to_string(), json!("email"));

        Ok(HttpRequest::post(self.objects("/batch/upsert"))
            .with_body(json!({"inputs": [Value::Object(input)]})))
    }

    /// `None` when the remote reported no upserted record.
    pub async fn create_or_update(
        &self,
        email: &str,
        data: Value,
    ) -> Result<Option<LegacyContact>, ApiError> {
        let page: ModernPage<ModernContact> =
            self.client.send_as(self.build_create_or_update(email, data)?).await?;
        Ok(page.results.into_iter().next().map(modern_contact_to_legacy))
    }

    pub fn build_create_or_update_batch(&self, items: Vec<Value>) -> HttpRequest {
        let inputs: Vec<Value> = items.into_iter().map(legacy_batch_item_to_modern).collect();
        HttpRequest::post(self.objects("/batch/upsert")).with_body(json!({"inputs": inputs}))
    }

    /// Legacy batch upserts answered with no content.
    pub async fn create_or_update_batch(&self, items: Vec<Value>) -> Result<(), ApiError> {
        self.client.send(self.build_create_or_update_batch(items)).await?;
        Ok(())
    }

    pub fn build_search(&self, query: &str, options: &SearchOptions) -> HttpRequest {
        let mut body = json!({
            "query": query,
            "limit": options.count.unwrap_or(self.client.config().default_page_size),
        });
        if let Some(after) = options.offset.as_deref().filter(|a| !a.is_empty()) {
            body["after"] = json!(after);
        }
        if !options.properties.is_empty() {
            body["properties"] = json!(options.properties);
        }
        HttpRequest::post(self.objects("/search")).with_body(body)
    }

    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<LegacySearchPage, ApiError> {
        let page: ModernPage<ModernContact> =
            self.client.send_as(self.build_search(query, options)).await?;
        Ok(modern_search_response_to_legacy(page, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::mock::MockExecutor;

    fn client(executor: MockExecutor) -> CrmClient<MockExecutor> {
        CrmClient::new(executor)
    }

    #[test]
    fn build_get_maps_legacy_options() {
        let c = client(MockExecutor::new());
        let req = c.contacts().build_get(&ContactPageOptions {
            count: Some(5),
            vid_offset: Some("200".to_string()),
            properties: vec!["email".to_string(), "phone".to_string()],
        });
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/crm/v3/objects/contacts");
        assert_eq!(req.query_value("limit"), Some("5"));
        assert_eq!(req.query_value("after"), Some("200"));
        assert_eq!(req.query_value("properties"), Some("email,phone"));
    }

    #[test]
    fn build_get_without_options_sends_no_query() {
        let c = client(MockExecutor::new());
        let req = c.contacts().build_get(&ContactPageOptions::default());
        assert!(req.query.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_recent_sorts_descending_with_default_limit() {
        let c = client(MockExecutor::new());
        let req = c
            .contacts()
            .build_recent(LAST_MODIFIED_PROPERTY, &ContactPageOptions::default());
        assert_eq!(req.path, "/crm/v3/objects/contacts/search");
        assert_eq!(
            req.body.unwrap(),
            json!({
                "sorts": [{"propertyName": "lastmodifieddate", "direction": "DESCENDING"}],
                "limit": 100
            })
        );
    }

    #[test]
    fn build_get_by_email_encodes_and_sets_id_property() {
        let c = client(MockExecutor::new());
        let req = c.contacts().build_get_by_email("a+b@x.com").unwrap();
        assert_eq!(req.path, "/crm/v3/objects/contacts/a%2Bb%40x.com");
        assert_eq!(req.query_value("idProperty"), Some("email"));
    }

    #[test]
    fn missing_identifiers_fail_before_any_request() {
        let c = client(MockExecutor::new());
        assert!(matches!(c.contacts().build_get_by_id(""), Err(ApiError::MissingArgument("id"))));
        assert!(matches!(c.contacts().build_delete(""), Err(ApiError::MissingArgument("id"))));
        assert!(matches!(
            c.contacts().build_get_by_email_batch::<&str>(&[]),
            Err(ApiError::MissingArgument("emails"))
        ));
        assert!(c.executor().recorded().is_empty());
    }

    #[test]
    fn build_create_or_update_injects_email_into_properties() {
        let c = client(MockExecutor::new());
        let req = c
            .contacts()
            .build_create_or_update(
                "ada@x.com",
                json!({"properties": [{"property": "firstname", "value": "Ada"}]}),
            )
            .unwrap();
        assert_eq!(req.path, "/crm/v3/objects/contacts/batch/upsert");
        assert_eq!(
            req.body.unwrap(),
            json!({"inputs": [{
                "properties": {"firstname": "Ada", "email": "ada@x.com"},
                "id": "ada@x.com",
                "idProperty": "email"
            }]})
        );
    }

    #[test]
    fn build_create_or_update_without_properties() {
        let c = client(MockExecutor::new());
        let req = c.contacts().build_create_or_update("a@x.com", json!({})).unwrap();
        assert_eq!(req.body.unwrap()["inputs"][0]["properties"], json!({"email": "a@x.com"}));
    }

    #[test]
    fn build_search_carries_query_and_paging() {
        let c = client(MockExecutor::new());
        let req = c.contacts().build_search(
            "ada",
            &SearchOptions {
                count: Some(10),
                offset: Some("20".to_string()),
                properties: vec!["email".to_string()],
            },
        );
        assert_eq!(
            req.body.unwrap(),
            json!({"query": "ada", "limit": 10, "after": "20", "properties": ["email"]})
        );
    }

    #[tokio::test]
    async fn get_translates_page() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Get,
            "/crm/v3/objects/contacts",
            json!({
                "results": [{"id": "123", "properties": {"email": "x@y.com"}}],
                "paging": {"next": {"after": "10"}}
            }),
        );
        let c = client(executor);
        let page = c.contacts().get(&ContactPageOptions::default()).await.unwrap();
        assert_eq!(page.contacts[0].vid, Some(123));
        assert!(page.has_more);
        assert_eq!(page.vid_offset, Some(10));
        assert_eq!(page.time_offset, Some(10));
    }

    #[tokio::test]
    async fn get_by_id_batch_is_keyed_by_vid() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Post,
            "/crm/v3/objects/contacts/batch/read",
            json!({"results": [
                {"id": "2", "properties": {"email": "b@x.com"}},
                {"id": "1", "properties": {"email": "a@x.com"}}
            ]}),
        );
        let c = client(executor);
        let map = c.contacts().get_by_id_batch(&[1, 2]).await.unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["2", "1"]);
        let recorded = c.executor().recorded();
        assert_eq!(recorded[0].body.as_ref().unwrap()["inputs"], json!([{"id": "1"}, {"id": "2"}]));
    }

    #[tokio::test]
    async fn update_discards_modern_record() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Patch,
            "/crm/v3/objects/contacts/5",
            json!({"id": "5", "properties": {}}),
        );
        let c = client(executor);
        c.contacts()
            .update("5", json!({"properties": [{"property": "firstname", "value": "Z"}]}))
            .await
            .unwrap();
        let body = c.executor().recorded()[0].body.clone().unwrap();
        assert_eq!(body, json!({"properties": {"firstname": "Z"}}));
    }

    #[tokio::test]
    async fn create_or_update_empty_results_is_none() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Post,
            "/crm/v3/objects/contacts/batch/upsert",
            json!({"results": []}),
        );
        let c = client(executor);
        let result = c.contacts().create_or_update("a@x.com", json!({})).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn remote_errors_propagate_unchanged() {
        let executor = MockExecutor::new().fail(
            HttpMethod::Get,
            "/crm/v3/objects/contacts/9",
            404,
            "Object not found",
        );
        let c = client(executor);
        let err = c.contacts().get_by_id("9").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404: Object not found");
    }

    #[tokio::test]
    async fn search_translates_envelope() {
        let executor = MockExecutor::new().respond(
            HttpMethod::Post,
            "/crm/v3/objects/contacts/search",
            json!({"total": 1, "results": [{"id": "3", "properties": {"email": "s@x.com"}}]}),
        );
        let c = client(executor);
        let page = c.contacts().search("s@x", &SearchOptions::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.query, "s@x");
        assert!(!page.has_more);
    }
}
