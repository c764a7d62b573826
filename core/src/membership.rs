//! List-membership densification.
//!
//! # Design
//! Modern membership endpoints return only `{recordId, membershipTimestamp}`
//! references, while legacy callers expect full contacts embedded in the
//! listing. `MembershipResolver` fetches one membership page, reads the
//! referenced contacts with chunked batch-read calls issued together, and
//! re-walks the membership page so the result keeps membership order.
//!
//! Enrichment is all-or-nothing per page: the chunk calls are joined
//! fail-fast and the first rejection aborts the whole resolution. A record
//! the batch-read did not return (deleted in between, say) degrades to a
//! contact with no properties and no identities.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::collection::{legacy_cursor, membership_shell, memberships_to_legacy};
use crate::entity::identity_profiles_for;
use crate::error::ApiError;
use crate::field_map::to_legacy_property_map;
use crate::options::MembershipOptions;
use crate::types::{LegacyContact, LegacyMembershipPage, Membership, ModernContact, ModernPage};

/// Which membership listing to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOrder {
    /// `/lists/{id}/memberships`, ordered by record id.
    RecordId,
    /// `/lists/{id}/memberships/join-order`, most recently added first.
    JoinOrder,
}

/// The two remote reads the resolver depends on.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    async fn fetch_memberships(
        &self,
        list_id: &str,
        order: MembershipOrder,
        options: &MembershipOptions,
    ) -> Result<ModernPage<Membership>, ApiError>;

    /// Read contacts by record id. `ids` never exceeds the resolver's chunk size.
    async fn batch_read(
        &self,
        ids: Vec<String>,
        properties: &[String],
    ) -> Result<Vec<ModernContact>, ApiError>;
}

pub struct MembershipResolver<'a, S: ?Sized> {
    source: &'a S,
    chunk_size: usize,
}

impl<'a, S: MembershipSource + ?Sized> MembershipResolver<'a, S> {
    /// `chunk_size` is clamped to at least 1.
    pub fn new(source: &'a S, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Fetch one membership page and embed the member contacts.
    pub async fn resolve(
        &self,
        list_id: &str,
        order: MembershipOrder,
        options: &MembershipOptions,
        properties: &[String],
    ) -> Result<LegacyMembershipPage, ApiError> {
        let page = self.source.fetch_memberships(list_id, order, options).await?;
        self.enrich(page, properties).await
    }

    /// Embed contact bodies into an already fetched membership page.
    ///
    /// Pagination comes from the membership page; batch reads are unpaged.
    pub async fn enrich(
        &self,
        page: ModernPage<Membership>,
        properties: &[String],
    ) -> Result<LegacyMembershipPage, ApiError> {
        if page.results.is_empty() {
            return Ok(memberships_to_legacy(page));
        }

        let chunks = chunk_record_ids(&page.results, self.chunk_size);
        debug!(
            members = page.results.len(),
            chunks = chunks.len(),
            "reading list members"
        );
        let batches = try_join_all(
            chunks
                .into_iter()
                .map(|ids| self.source.batch_read(ids, properties)),
        )
        .await?;

        // Chunks are disjoint, so a repeated id can only come from the remote;
        // the later record wins.
        let mut by_id: HashMap<String, ModernContact> = HashMap::new();
        for contact in batches.into_iter().flatten() {
            by_id.insert(contact.id.clone(), contact);
        }

        let (has_more, vid_offset) = legacy_cursor(&page);
        let contacts = page
            .results
            .iter()
            .map(|membership| match by_id.get(&membership.record_id) {
                Some(contact) => merge_member(membership, contact),
                None => {
                    warn!(record_id = %membership.record_id, "list member missing from batch read");
                    membership_shell(membership)
                }
            })
            .collect();

        Ok(LegacyMembershipPage {
            contacts,
            has_more,
            vid_offset,
        })
    }
}

/// Split membership record ids into batch-read sized chunks, dropping
/// repeated ids and keeping first-seen order.
pub fn chunk_record_ids(memberships: &[Membership], chunk_size: usize) -> Vec<Vec<String>> {
    let mut seen = HashSet::with_capacity(memberships.len());
    let unique: Vec<String> = memberships
        .iter()
        .filter(|m| seen.insert(m.record_id.as_str()))
        .map(|m| m.record_id.clone())
        .collect();
    unique
        .chunks(chunk_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

fn merge_member(membership: &Membership, contact: &ModernContact) -> LegacyContact {
    let mut legacy = membership_shell(membership);
    legacy.properties = to_legacy_property_map(&contact.properties);
    legacy.identity_profiles = identity_profiles_for(&contact.properties);
    legacy
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::types::{NextPage, Paging};

    /// Serves a fixed membership page and answers batch reads from a
    /// contact table, recording every batch call.
    struct FakeSource {
        page: ModernPage<Membership>,
        contacts: HashMap<String, ModernContact>,
        reverse_batches: bool,
        fail_on: Option<String>,
        batch_calls: Mutex<Vec<Vec<String>>>,
        fetch_calls: Mutex<Vec<(String, MembershipOrder)>>,
    }

    impl FakeSource {
        fn new(record_ids: &[&str], next: Option<&str>) -> Self {
            let results = record_ids
                .iter()
                .map(|id| Membership {
                    record_id: id.to_string(),
                    membership_timestamp: Some("2024-01-01T00:00:00Z".to_string()),
                })
                .collect();
            let contacts = record_ids
                .iter()
                .map(|id| {
                    let contact: ModernContact = serde_json::from_value(json!({
                        "id": id,
                        "properties": {"email": format!("{id}@example.com"), "firstname": "N"}
                    }))
                    .unwrap();
                    (id.to_string(), contact)
                })
                .collect();
            Self {
                page: ModernPage {
                    results,
                    paging: next.map(|after| Paging {
                        next: Some(NextPage {
                            after: after.to_string(),
                            link: None,
                        }),
                    }),
                    total: None,
                },
                contacts,
                reverse_batches: false,
                fail_on: None,
                batch_calls: Mutex::new(Vec::new()),
                fetch_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MembershipSource for FakeSource {
        async fn fetch_memberships(
            &self,
            list_id: &str,
            order: MembershipOrder,
            _options: &MembershipOptions,
        ) -> Result<ModernPage<Membership>, ApiError> {
            self.fetch_calls.lock().unwrap().push((list_id.to_string(), order));
            Ok(self.page.clone())
        }

        async fn batch_read(
            &self,
            ids: Vec<String>,
            _properties: &[String],
        ) -> Result<Vec<ModernContact>, ApiError> {
            self.batch_calls.lock().unwrap().push(ids.clone());
            if let Some(bad) = &self.fail_on {
                if ids.contains(bad) {
                    return Err(ApiError::Remote {
                        status: 500,
                        message: "batch failed".to_string(),
                    });
                }
            }
            let mut found: Vec<ModernContact> = ids
                .iter()
                .filter_map(|id| self.contacts.get(id).cloned())
                .collect();
            if self.reverse_batches {
                found.reverse();
            }
            Ok(found)
        }
    }

    fn props() -> Vec<String> {
        vec!["email".to_string()]
    }

    #[tokio::test]
    async fn empty_page_short_circuits() {
        let source = FakeSource::new(&[], None);
        let resolver = MembershipResolver::new(&source, 100);
        let page = resolver
            .resolve("1", MembershipOrder::RecordId, &MembershipOptions::default(), &props())
            .await
            .unwrap();
        assert!(page.contacts.is_empty());
        assert!(!page.has_more);
        assert!(source.batch_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn preserves_membership_order() {
        let mut source = FakeSource::new(&["3", "1", "2"], None);
        source.reverse_batches = true;
        let resolver = MembershipResolver::new(&source, 100);
        let page = resolver
            .resolve("1", MembershipOrder::RecordId, &MembershipOptions::default(), &props())
            .await
            .unwrap();
        let vids: Vec<Option<i64>> = page.contacts.iter().map(|c| c.vid).collect();
        assert_eq!(vids, vec![Some(3), Some(1), Some(2)]);
        assert_eq!(
            page.contacts[0].properties.get("email").unwrap().value,
            json!("3@example.com")
        );
        assert_eq!(page.contacts[0].identity_profiles[0].identities[0].value, "3@example.com");
        assert_eq!(page.contacts[0].added_at, Some(1_704_067_200_000));
    }

    #[tokio::test]
    async fn chunks_cover_every_record_once() {
        let ids: Vec<String> = (1..=250).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let source = FakeSource::new(&refs, None);
        let resolver = MembershipResolver::new(&source, 100);
        let page = resolver
            .resolve("1", MembershipOrder::RecordId, &MembershipOptions::default(), &props())
            .await
            .unwrap();
        assert_eq!(page.contacts.len(), 250);

        let calls = source.batch_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        let mut covered: Vec<String> = calls.iter().flatten().cloned().collect();
        assert_eq!(covered.len(), 250);
        covered.sort();
        covered.dedup();
        assert_eq!(covered.len(), 250);
        assert!(calls.iter().all(|chunk| chunk.len() <= 100));
    }

    #[tokio::test]
    async fn missing_record_degrades_to_shell() {
        let mut source = FakeSource::new(&["10", "11"], None);
        source.contacts.remove("11");
        let resolver = MembershipResolver::new(&source, 100);
        let page = resolver
            .resolve("1", MembershipOrder::RecordId, &MembershipOptions::default(), &props())
            .await
            .unwrap();
        let shell = &page.contacts[1];
        assert_eq!(shell.vid, Some(11));
        assert!(shell.properties.is_empty());
        assert!(shell.identity_profiles.is_empty());
        assert_eq!(shell.added_at, Some(1_704_067_200_000));
    }

    #[tokio::test]
    async fn chunk_failure_aborts_resolution() {
        let ids: Vec<String> = (1..=150).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut source = FakeSource::new(&refs, None);
        source.fail_on = Some("120".to_string());
        let resolver = MembershipResolver::new(&source, 100);
        let err = resolver
            .resolve("1", MembershipOrder::RecordId, &MembershipOptions::default(), &props())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn pagination_comes_from_membership_page() {
        let source = FakeSource::new(&["5"], Some("300"));
        let resolver = MembershipResolver::new(&source, 100);
        let page = resolver
            .resolve("9", MembershipOrder::JoinOrder, &MembershipOptions::default(), &props())
            .await
            .unwrap();
        assert!(page.has_more);
        assert_eq!(page.vid_offset, Some(300));
        assert_eq!(
            source.fetch_calls.lock().unwrap()[0],
            ("9".to_string(), MembershipOrder::JoinOrder)
        );
    }

    #[test]
    fn chunking_drops_repeated_ids() {
        let memberships: Vec<Membership> = ["1", "2", "1", "3"]
            .iter()
            .map(|id| Membership {
                record_id: id.to_string(),
                membership_timestamp: None,
            })
            .collect();
        let chunks = chunk_record_ids(&memberships, 2);
        assert_eq!(chunks, vec![vec!["1".to_string(), "2".to_string()], vec!["3".to_string()]]);
    }
}
