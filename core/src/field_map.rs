//! Property representation conversions between the two dialects.
//!
//! Legacy writes carry `[{property, value}]` arrays; the modern API wants a
//! `{name: value}` object. Legacy reads expect every value wrapped as
//! `{value: v}`.

use serde_json::{Map, Value};

use crate::ordered::{CollisionPolicy, OrderedMap};
use crate::types::{LegacyProperty, ModernProperties, PropertyValue};

/// Convert the `properties` field of a legacy request body to the modern object form.
///
/// Bodies without a `properties` array are returned unchanged, as are bodies
/// whose array is empty. Entries lacking a key or a `value` are dropped.
/// Every other field of the body is carried over as-is.
pub fn to_modern_properties(data: Value) -> Value {
    let Value::Object(mut body) = data else {
        return data;
    };
    let items = match body.get("properties") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Value::Object(body),
    };

    let legacy: Vec<LegacyProperty> = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();
    body.insert(
        "properties".to_string(),
        Value::Object(legacy_properties_to_modern(&legacy)),
    );
    Value::Object(body)
}

/// Fold a legacy property array into a modern property object.
/// A repeated name keeps its first position and its last value.
pub fn legacy_properties_to_modern(properties: &[LegacyProperty]) -> ModernProperties {
    let mut map = OrderedMap::with_capacity(properties.len());
    for prop in properties {
        let (Some(key), Some(value)) = (prop.key(), prop.value.as_ref()) else {
            continue;
        };
        // KeepLast never fails.
        let _ = map.insert(key, value.clone(), CollisionPolicy::KeepLast);
    }
    map.into_iter().collect::<Map<String, Value>>()
}

/// Wrap each modern value as `{value: v}`. Nested values are wrapped as-is.
pub fn to_legacy_property_map(properties: &ModernProperties) -> OrderedMap<PropertyValue> {
    let mut map = OrderedMap::with_capacity(properties.len());
    for (key, value) in properties {
        let _ = map.insert(
            key.as_str(),
            PropertyValue {
                value: value.clone(),
            },
            CollisionPolicy::KeepLast,
        );
    }
    map
}
