//! Paged-collection translation.
//!
//! The modern dialect pages with an opaque `paging.next.after` cursor; the
//! legacy dialect exposes a `has-more` flag plus an integer offset. For every
//! page produced here `has-more` is true exactly when the offset is set.

use serde_json::{Map, Value};

use crate::entity::{
    iso_to_epoch_millis, modern_contact_to_legacy, parse_numeric_id, DEFAULT_PROCESSING_TYPE,
};
use crate::error::ApiError;
use crate::ordered::OrderedMap;
use crate::types::{
    LegacyContact, LegacyContactPage, LegacyList, LegacyListPage, LegacyLists,
    LegacyMembershipPage, LegacySearchPage, ListMetaData, Membership, ModernContact, ModernList,
    ModernPage,
};

/// Legacy pagination derived from a modern page: `(has-more, offset)`.
///
/// A cursor that is present but not numeric still reports `has-more`, with
/// no offset the legacy caller could use.
pub fn legacy_cursor<T>(page: &ModernPage<T>) -> (bool, Option<i64>) {
    match page.next_after() {
        Some(after) => (true, parse_numeric_id(after)),
        None => (false, None),
    }
}

/// Contacts list page. `time-offset` mirrors `vid-offset`.
pub fn modern_list_response_to_legacy(page: ModernPage<ModernContact>) -> LegacyContactPage {
    let (has_more, offset) = legacy_cursor(&page);
    LegacyContactPage {
        contacts: page.results.into_iter().map(modern_contact_to_legacy).collect(),
        has_more,
        vid_offset: offset,
        time_offset: offset,
    }
}

/// Search page. `total` falls back to the number of results on this page.
pub fn modern_search_response_to_legacy(
    page: ModernPage<ModernContact>,
    query: &str,
) -> LegacySearchPage {
    let (has_more, offset) = legacy_cursor(&page);
    let total = page.total.filter(|t| *t > 0);
    let contacts: Vec<LegacyContact> =
        page.results.into_iter().map(modern_contact_to_legacy).collect();
    LegacySearchPage {
        total: total.unwrap_or(contacts.len() as u64),
        contacts,
        has_more,
        offset,
        query: query.to_string(),
    }
}

/// Plain membership page. Each contact is a shell: `vid` and `addedAt` are
/// set, `properties` and `identity-profiles` are empty.
pub fn memberships_to_legacy(page: ModernPage<Membership>) -> LegacyMembershipPage {
    let (has_more, vid_offset) = legacy_cursor(&page);
    LegacyMembershipPage {
        contacts: page.results.iter().map(membership_shell).collect(),
        has_more,
        vid_offset,
    }
}

/// Legacy contact for a membership whose record body is unknown.
pub(crate) fn membership_shell(membership: &Membership) -> LegacyContact {
    LegacyContact {
        vid: parse_numeric_id(&membership.record_id),
        properties: OrderedMap::new(),
        identity_profiles: Vec::new(),
        added_at: membership
            .membership_timestamp
            .as_deref()
            .and_then(iso_to_epoch_millis),
        extra: Default::default(),
    }
}

/// Translate list metadata. `metaData.size` falls back to `memberCount`, then 0.
pub fn modern_list_to_legacy(list: ModernList) -> LegacyList {
    let ModernList {
        list_id,
        name,
        size,
        extra,
    } = list;
    let size = size
        .filter(|s| *s > 0)
        .or_else(|| extra.get("memberCount").and_then(Value::as_u64))
        .unwrap_or(0);
    let processing = extra
        .get("processingType")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROCESSING_TYPE)
        .to_string();

    LegacyList {
        list_id: parse_numeric_id(&list_id),
        name,
        meta_data: Some(ListMetaData { size, processing }),
        extra,
    }
}

/// A list-search response that is either modern, or already legacy-shaped
/// (compatibility doubles answer in the legacy dialect). The legacy body is
/// kept as received.
#[derive(Debug, Clone, PartialEq)]
pub enum ListsResponse {
    Modern(ModernPage<ModernList>),
    Legacy(Map<String, Value>),
}

impl ListsResponse {
    /// Classify a raw response body.
    ///
    /// Precedence: an object carrying a `lists` key is legacy, even if it also
    /// carries `results`; anything else is parsed as a modern page. A modern
    /// response that happens to include a `lists` field is misclassified,
    /// which is why callers that know the dialect should build the variant
    /// themselves.
    pub fn detect(body: Value) -> Result<Self, ApiError> {
        match body {
            Value::Object(map) if map.contains_key(LEGACY_LISTS_KEY) => {
                Ok(ListsResponse::Legacy(map))
            }
            Value::Null => Ok(ListsResponse::Modern(ModernPage::default())),
            other => serde_json::from_value(other)
                .map(ListsResponse::Modern)
                .map_err(|e| ApiError::Deserialization(e.to_string())),
        }
    }
}

const LEGACY_LISTS_KEY: &str = "lists";

/// True when `body` is an object with a `lists` key.
pub fn is_legacy_lists_shape(body: &Value) -> bool {
    body.as_object()
        .is_some_and(|o| o.contains_key(LEGACY_LISTS_KEY))
}

/// Lists page. Legacy-shaped input is returned unchanged.
pub fn modern_lists_to_legacy(response: ListsResponse) -> LegacyLists {
    match response {
        ListsResponse::Legacy(body) => LegacyLists::Verbatim(body),
        ListsResponse::Modern(page) => {
            let (has_more, offset) = legacy_cursor(&page);
            LegacyLists::Translated(LegacyListPage {
                lists: page.results.into_iter().map(modern_list_to_legacy).collect(),
                has_more,
                offset,
            })
        }
    }
}
