//! Legacy (v1) CRM client surface backed by the modern (v3) REST API.
//!
//! # Overview
//! Callers written against the legacy contacts, contact-properties, lists
//! and owners API keep their request and response shapes. Each call is
//! translated into one or more modern requests, and every modern response is
//! reshaped back into the legacy dialect.
//!
//! # Design
//! - Translators (`field_map`, `entity`, `collection`) are pure functions
//!   over typed records and can be used without a client.
//! - `MembershipResolver` turns a page of list memberships into a page of
//!   full contacts through chunked, concurrent batch reads.
//! - `CrmClient` exposes the resource facades and sends modern requests
//!   through an `HttpExecutor`; `ReqwestExecutor` (feature `reqwest`) is the
//!   bundled implementation.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod collection;
pub mod config;
pub mod contacts;
pub mod entity;
pub mod error;
pub mod field_map;
pub mod http;
pub mod lists;
pub mod membership;
pub mod options;
pub mod ordered;
pub mod owners;
pub mod properties;
#[cfg(feature = "reqwest")]
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

pub use client::CrmClient;
pub use config::CompatConfig;
pub use error::ApiError;
pub use http::{parse_response, HttpExecutor, HttpMethod, HttpRequest, HttpResponse};
pub use membership::{MembershipOrder, MembershipResolver, MembershipSource};
pub use options::{
    ContactPageOptions, ListPageOptions, MembershipOptions, OwnerOptions, PropertyOptions,
    SearchOptions,
};
pub use ordered::{CollisionPolicy, OrderedMap};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestExecutor;
pub use types::{
    LegacyContact, LegacyContactPage, LegacyList, LegacyListPage, LegacyLists,
    LegacyMembershipPage, LegacyProperty, LegacySearchPage, ModernContact, ModernList, ModernPage,
};
