//! Contact lists facade.
//!
//! # Design
//! List metadata goes through the collection translator. Member listings
//! need a second round trip, since modern memberships are references only;
//! `CrmClient` implements `MembershipSource` so `MembershipResolver` can
//! drive both reads through the same executor.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::{decode, encode_segment, require, CrmClient};
use crate::collection::{modern_list_to_legacy, modern_lists_to_legacy, ListsResponse};
use crate::entity::{add_contacts_to_modern, list_create_to_modern};
use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpRequest};
use crate::membership::{MembershipOrder, MembershipResolver, MembershipSource};
use crate::options::{ListPageOptions, MembershipOptions};
use crate::types::{
    LegacyList, LegacyLists, LegacyMembershipPage, Membership, ModernContact, ModernList,
    ModernPage,
};

pub struct Lists<'a, E> {
    client: &'a CrmClient<E>,
}

impl<'a, E: HttpExecutor> Lists<'a, E> {
    pub(crate) fn new(client: &'a CrmClient<E>) -> Self {
        Self { client }
    }

    fn list(&self, id: &str, suffix: &str) -> Result<String, ApiError> {
        let id = require(id, "id")?;
        Ok(self.client.path(&format!("/lists/{}{suffix}", encode_segment(id))))
    }

    pub fn build_get(&self, options: &ListPageOptions) -> HttpRequest {
        HttpRequest::post(self.client.path("/lists/search")).with_body(json!({
            "listIds": [],
            "offset": options.offset.unwrap_or(0),
            "count": options.count.unwrap_or(self.client.config().default_list_count),
        }))
    }

    /// One page of lists. A legacy-shaped reply comes back verbatim.
    pub async fn get(&self, options: &ListPageOptions) -> Result<LegacyLists, ApiError> {
        let body = self.client.send(self.build_get(options)).await?;
        Ok(modern_lists_to_legacy(ListsResponse::detect(body)?))
    }

    pub async fn get_one(&self, id: &str) -> Result<LegacyList, ApiError> {
        let body = self.client.send(HttpRequest::get(self.list(id, "")?)).await?;
        Ok(modern_list_to_legacy(decode_list(body)?))
    }

    pub fn build_create(&self, data: Value) -> HttpRequest {
        HttpRequest::post(self.client.path("/lists")).with_body(list_create_to_modern(data))
    }

    pub async fn create(&self, data: Value) -> Result<LegacyList, ApiError> {
        let body = self.client.send(self.build_create(data)).await?;
        Ok(modern_list_to_legacy(decode_list(body)?))
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.send(HttpRequest::delete(self.list(id, "")?)).await?;
        Ok(())
    }

    /// Members ordered by record id, with contact bodies embedded.
    pub async fn get_contacts(
        &self,
        id: &str,
        options: &MembershipOptions,
    ) -> Result<LegacyMembershipPage, ApiError> {
        self.resolve_members(id, MembershipOrder::RecordId, options).await
    }

    /// Members in join order, with contact bodies embedded.
    pub async fn get_recent_contacts(
        &self,
        id: &str,
        options: &MembershipOptions,
    ) -> Result<LegacyMembershipPage, ApiError> {
        self.resolve_members(id, MembershipOrder::JoinOrder, options).await
    }

    async fn resolve_members(
        &self,
        id: &str,
        order: MembershipOrder,
        options: &MembershipOptions,
    ) -> Result<LegacyMembershipPage, ApiError> {
        require(id, "id")?;
        let config = self.client.config();
        let properties = if options.properties.is_empty() {
            &config.membership_properties
        } else {
            &options.properties
        };
        MembershipResolver::new(self.client, config.batch_read_limit)
            .resolve(id, order, options, properties)
            .await
    }

    pub fn build_add_contacts(&self, id: &str, body: Value) -> Result<HttpRequest, ApiError> {
        self.build_membership_change(id, "/memberships/add", body)
    }

    pub async fn add_contacts(&self, id: &str, body: Value) -> Result<Value, ApiError> {
        self.client.send(self.build_add_contacts(id, body)?).await
    }

    pub fn build_remove_contacts(&self, id: &str, body: Value) -> Result<HttpRequest, ApiError> {
        self.build_membership_change(id, "/memberships/remove", body)
    }

    pub async fn remove_contacts(&self, id: &str, body: Value) -> Result<Value, ApiError> {
        self.client.send(self.build_remove_contacts(id, body)?).await
    }

    fn build_membership_change(
        &self,
        id: &str,
        suffix: &str,
        body: Value,
    ) -> Result<HttpRequest, ApiError> {
        let path = self.list(id, suffix)?;
        if body.is_null() {
            return Err(ApiError::MissingArgument("contactBody"));
        }
        Ok(HttpRequest::put(path).with_body(add_contacts_to_modern(body)))
    }
}

/// Single-list responses may wrap the record as `{list: {...}}`.
fn decode_list(body: Value) -> Result<ModernList, ApiError> {
    match body {
        Value::Object(mut fields) if fields.get("list").is_some_and(Value::is_object) => {
            decode(fields.remove("list").unwrap_or_default())
        }
        other => decode(other),
    }
}

#[async_trait]
impl<E: HttpExecutor> MembershipSource for CrmClient<E> {
    async fn fetch_memberships(
        &self,
        list_id: &str,
        order: MembershipOrder,
        options: &MembershipOptions,
    ) -> Result<ModernPage<Membership>, ApiError> {
        let suffix = match order {
            MembershipOrder::RecordId => "/memberships",
            MembershipOrder::JoinOrder => "/memberships/join-order",
        };
        let mut request = HttpRequest::get(
            self.path(&format!("/lists/{}{suffix}", encode_segment(list_id))),
        );
        if let Some(count) = options.count {
            request = request.with_query("limit", count.to_string());
        }
        if let Some(after) = options.vid_offset.as_deref().filter(|a| !a.is_empty()) {
            request = request.with_query("after", after);
        }
        self.send_as(request).await
    }

    async fn batch_read(
        &self,
        ids: Vec<String>,
        properties: &[String],
    ) -> Result<Vec<ModernContact>, ApiError> {
        let inputs: Vec<Value> = ids.into_iter().map(|id| json!({"id": id})).collect();
        let request = HttpRequest::post(self.path("/objects/contacts/batch/read"))
            .with_body(json!({"inputs": inputs, "properties": properties}));
        let page: ModernPage<ModernContact> = self.send_as(request).await?;
        Ok(page.results)
    }
}
