//! Single-record translation between the dialects.
//!
//! # Design
//! Response-side functions take modern records by value and return fresh
//! legacy records; request-side functions rewrite loosely-typed legacy
//! bodies into the modern form just before they are sent. Derived legacy
//! fields are synthesized here: `vid` from the string id, identity profiles
//! from `email`, and `addedAt` from the ISO `createdAt`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::field_map::{to_legacy_property_map, to_modern_properties};
use crate::ordered::{CollisionPolicy, OrderedMap};
use crate::types::{
    Identity, IdentityProfile, LegacyContact, ModernContact, ModernProperties, EMAIL_IDENTITY,
};

/// Object type id of contacts in the modern lists API.
pub const CONTACT_OBJECT_TYPE_ID: &str = "0-1";
pub const DEFAULT_PROCESSING_TYPE: &str = "MANUAL";

/// Legacy keys synthesized by `modern_contact_to_legacy`; pass-through
/// fields never shadow them.
const SYNTHESIZED_KEYS: [&str; 4] = ["vid", "properties", "identity-profiles", "addedAt"];

/// Base-10 parse with the lenient semantics legacy callers relied on:
/// leading whitespace and a sign are accepted, parsing stops at the first
/// non-digit, and a string without leading digits yields `None`.
pub fn parse_numeric_id(id: &str) -> Option<i64> {
    let trimmed = id.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse an ISO-8601 timestamp into epoch milliseconds. Timestamps without an
/// offset are read as UTC; unparseable input yields `None`.
pub fn iso_to_epoch_millis(timestamp: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// One profile holding one `EMAIL` identity when `email` is a non-empty
/// string, otherwise no profiles at all.
pub fn identity_profiles_for(properties: &ModernProperties) -> Vec<IdentityProfile> {
    match properties.get("email").and_then(Value::as_str) {
        Some(email) if !email.is_empty() => vec![IdentityProfile {
            identities: vec![Identity {
                kind: EMAIL_IDENTITY.to_string(),
                value: email.to_string(),
            }],
        }],
        _ => Vec::new(),
    }
}

/// Translate a modern contact into the legacy contact shape.
pub fn modern_contact_to_legacy(contact: ModernContact) -> LegacyContact {
    let ModernContact {
        id,
        properties,
        created_at,
        mut extra,
    } = contact;
    for key in SYNTHESIZED_KEYS {
        extra.remove(key);
    }

    LegacyContact {
        vid: parse_numeric_id(&id),
        identity_profiles: identity_profiles_for(&properties),
        properties: to_legacy_property_map(&properties),
        added_at: created_at.as_deref().and_then(iso_to_epoch_millis),
        extra,
    }
}

/// Rewrite a legacy create/update body for the modern API.
pub fn legacy_properties_to_modern_request(data: Value) -> Value {
    to_modern_properties(data)
}

/// Rewrite one item of a legacy batch upsert: properties become an object
/// and a legacy `vid` becomes the modern string `id`.
pub fn legacy_batch_item_to_modern(item: Value) -> Value {
    let mut converted = to_modern_properties(item);
    if let Value::Object(body) = &mut converted {
        if let Some(vid) = body.remove("vid") {
            let id = match vid {
                Value::String(s) if !s.is_empty() => Some(s),
                Value::Number(n) if n.as_i64() != Some(0) => Some(n.to_string()),
                _ => None,
            };
            if let Some(id) = id {
                body.insert("id".to_string(), Value::String(id));
            }
        }
    }
    converted
}

/// Key a batch of modern contacts by their legacy `vid`.
///
/// Contacts whose id is not numeric are keyed by the raw id. When two
/// contacts produce the same key, `policy` decides which one is kept.
pub fn modern_batch_to_legacy_map(
    contacts: Vec<ModernContact>,
    policy: CollisionPolicy,
) -> Result<OrderedMap<LegacyContact>, ApiError> {
    let mut map = OrderedMap::with_capacity(contacts.len());
    for contact in contacts {
        let raw_id = contact.id.clone();
        let legacy = modern_contact_to_legacy(contact);
        let key = legacy.vid.map(|vid| vid.to_string()).unwrap_or(raw_id);
        if map.insert(key.clone(), legacy, policy)? {
            warn!(key = %key, ?policy, "batch result key collision");
        }
    }
    Ok(map)
}

/// Fill in what the modern list-create call requires. Caller fields win.
pub fn list_create_to_modern(data: Value) -> Value {
    let mut body = json!({
        "objectTypeId": CONTACT_OBJECT_TYPE_ID,
        "processingType": DEFAULT_PROCESSING_TYPE,
    });
    if let (Value::Object(target), Value::Object(source)) = (&mut body, data) {
        for (key, value) in source {
            if key == "processingType" && value.is_null() {
                continue;
            }
            target.insert(key, value);
        }
    }
    body
}

/// Legacy add/remove bodies name members as `{vids: [...]}` or
/// `{emails: [...]}`; the modern API takes the bare array.
pub fn add_contacts_to_modern(body: Value) -> Value {
    match body {
        Value::Array(_) => body,
        Value::Object(mut fields) => fields
            .remove("vids")
            .filter(|v| !v.is_null())
            .or_else(|| fields.remove("emails").filter(|v| !v.is_null()))
            .unwrap_or_else(|| Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    }
}
