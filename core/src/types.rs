//! DTOs for both API dialects.
//!
//! # Design
//! Legacy (v1) and modern (v3) shapes are separate types; translation is
//! copy-based and every translated value is freshly owned. Fields the
//! translators do not understand are kept in `extra` maps so new remote
//! fields reach legacy callers instead of being dropped.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ordered::OrderedMap;

/// Modern property set: property name to scalar value.
pub type ModernProperties = Map<String, Value>;

/// Identity type synthesized from the `email` property.
pub const EMAIL_IDENTITY: &str = "EMAIL";

/// One entry of a legacy property array. Older endpoints spell the key
/// field `property`, a few use `name`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `Some(Value::Null)` for an explicit `"value": null`, `None` when absent.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

impl LegacyProperty {
    pub fn new(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            property: Some(property.into()),
            name: None,
            value: Some(value.into()),
        }
    }

    /// `property` takes precedence over `name`; empty strings count as missing.
    pub fn key(&self) -> Option<&str> {
        self.property
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.is_empty()))
    }
}

/// Legacy property value wrapper: `{"value": v}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityProfile {
    #[serde(default)]
    pub identities: Vec<Identity>,
}

/// A contact in the legacy dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyContact {
    /// `None` when the modern id was not a numeric string.
    pub vid: Option<i64>,
    #[serde(default)]
    pub properties: OrderedMap<PropertyValue>,
    #[serde(rename = "identity-profiles", default)]
    pub identity_profiles: Vec<IdentityProfile>,
    /// Epoch milliseconds.
    #[serde(rename = "addedAt", default)]
    pub added_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A contact in the modern dialect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModernContact {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: ModernProperties,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextPage {
    #[serde(deserialize_with = "id_string")]
    pub after: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextPage>,
}

/// Cursor-paged envelope of the modern dialect. `paging.next` is present
/// exactly when another page exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModernPage<T> {
    #[serde(
        default = "Vec::new",
        deserialize_with = "null_as_default",
        bound(deserialize = "T: Deserialize<'de>")
    )]
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ModernPage<T> {
    /// Cursor of the next page, if the remote announced one.
    pub fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
    }
}

impl<T> Default for ModernPage<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            paging: None,
            total: None,
        }
    }
}

/// A list membership: a reference to a contact, not the contact itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "recordId", deserialize_with = "id_string")]
    pub record_id: String,
    #[serde(rename = "membershipTimestamp", default)]
    pub membership_timestamp: Option<String>,
}

/// Legacy contact page. `has-more` is true exactly when `vid-offset` is set;
/// `time-offset` always mirrors `vid-offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyContactPage {
    pub contacts: Vec<LegacyContact>,
    #[serde(rename = "has-more")]
    pub has_more: bool,
    #[serde(rename = "vid-offset")]
    pub vid_offset: Option<i64>,
    #[serde(rename = "time-offset")]
    pub time_offset: Option<i64>,
}

/// Legacy list-membership page (contacts embedded in membership order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyMembershipPage {
    pub contacts: Vec<LegacyContact>,
    #[serde(rename = "has-more")]
    pub has_more: bool,
    #[serde(rename = "vid-offset")]
    pub vid_offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySearchPage {
    pub contacts: Vec<LegacyContact>,
    #[serde(rename = "has-more")]
    pub has_more: bool,
    pub offset: Option<i64>,
    pub total: u64,
    pub query: String,
}

/// List metadata in the modern dialect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModernList {
    #[serde(rename = "listId", default, deserialize_with = "id_string")]
    pub list_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMetaData {
    pub size: u64,
    pub processing: String,
}

/// List metadata in the legacy dialect: integer `listId`, size under `metaData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyList {
    #[serde(rename = "listId", default, deserialize_with = "lenient_i64")]
    pub list_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "metaData", default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<ListMetaData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyListPage {
    pub lists: Vec<LegacyList>,
    #[serde(rename = "has-more", alias = "hasMore", default)]
    pub has_more: bool,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Lists page handed to legacy callers: translated from a modern page, or a
/// body that was already legacy-shaped, exactly as the remote sent it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LegacyLists {
    Translated(LegacyListPage),
    Verbatim(Map<String, Value>),
}

impl LegacyLists {
    pub fn translated(&self) -> Option<&LegacyListPage> {
        match self {
            LegacyLists::Translated(page) => Some(page),
            LegacyLists::Verbatim(_) => None,
        }
    }
}

/// Accepts `null`, so an explicit `"value": null` is distinguishable from absence.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Remote ids are strings, but some endpoints and test doubles send numbers.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integer, or a string with leading digits (`"123"`); anything else is `None`.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => crate::entity::parse_numeric_id(&s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_property_distinguishes_null_from_missing() {
        let explicit: LegacyProperty =
            serde_json::from_value(json!({"property": "email", "value": null})).unwrap();
        assert_eq!(explicit.value, Some(Value::Null));

        let missing: LegacyProperty = serde_json::from_value(json!({"property": "email"})).unwrap();
        assert_eq!(missing.value, None);
    }

    #[test]
    fn legacy_property_key_prefers_property() {
        let both = LegacyProperty {
            property: Some("email".to_string()),
            name: Some("other".to_string()),
            value: Some(json!("x")),
        };
        assert_eq!(both.key(), Some("email"));

        let name_only = LegacyProperty {
            property: Some(String::new()),
            name: Some("firstname".to_string()),
            value: Some(json!("x")),
        };
        assert_eq!(name_only.key(), Some("firstname"));
    }

    #[test]
    fn modern_contact_keeps_unknown_fields() {
        let contact: ModernContact = serde_json::from_value(json!({
            "id": "42",
            "properties": {"email": "a@b.com"},
            "createdAt": "2024-01-01T00:00:00Z",
            "archived": false
        }))
        .unwrap();
        assert_eq!(contact.id, "42");
        assert_eq!(contact.extra.get("archived"), Some(&json!(false)));
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let membership: Membership =
            serde_json::from_value(json!({"recordId": 100, "membershipTimestamp": null})).unwrap();
        assert_eq!(membership.record_id, "100");
        assert!(membership.membership_timestamp.is_none());
    }

    #[test]
    fn modern_page_defaults() {
        let page: ModernPage<ModernContact> = serde_json::from_value(json!({})).unwrap();
        assert!(page.results.is_empty());
        assert!(page.next_after().is_none());

        let page: ModernPage<ModernContact> =
            serde_json::from_value(json!({"results": [], "paging": {"next": {"after": "10"}}}))
                .unwrap();
        assert_eq!(page.next_after(), Some("10"));
    }

    #[test]
    fn null_properties_read_as_empty() {
        let contact: ModernContact =
            serde_json::from_value(json!({"id": "1", "properties": null})).unwrap();
        assert!(contact.properties.is_empty());

        let page: ModernPage<ModernContact> = serde_json::from_value(json!({
            "results": [{"id": "1", "properties": null}]
        }))
        .unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.results[0].properties.is_empty());
    }

    #[test]
    fn null_results_read_as_empty_page() {
        let page: ModernPage<ModernContact> =
            serde_json::from_value(json!({"results": null, "total": 0})).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total, Some(0));
    }

    #[test]
    fn legacy_list_id_accepts_numeric_strings() {
        let list: LegacyList =
            serde_json::from_value(json!({"listId": "15", "name": "L"})).unwrap();
        assert_eq!(list.list_id, Some(15));
        let list: LegacyList = serde_json::from_value(json!({"listId": 16})).unwrap();
        assert_eq!(list.list_id, Some(16));
    }

    #[test]
    fn legacy_contact_page_serializes_hyphenated_keys() {
        let page = LegacyContactPage {
            contacts: Vec::new(),
            has_more: false,
            vid_offset: None,
            time_offset: None,
        };
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            json!({"contacts": [], "has-more": false, "vid-offset": null, "time-offset": null})
        );
    }
}
