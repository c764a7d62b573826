//! Per-operation options.
//!
//! Each facade call takes one of these instead of probing a loose options
//! object. `None`/empty fields mean "not sent" unless the field documents a
//! default.

/// Contacts listing (`Contacts::get`) and the sorted recent listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPageOptions {
    /// Page size. The plain listing leaves it to the remote; the sorted
    /// listings fall back to `CompatConfig::default_page_size`.
    pub count: Option<u32>,
    /// Legacy offset, sent as the modern `after` cursor.
    pub vid_offset: Option<String>,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Defaults to `CompatConfig::default_page_size`.
    pub count: Option<u32>,
    pub offset: Option<String>,
    pub properties: Vec<String>,
}

/// List search (`Lists::get`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPageOptions {
    /// Defaults to `CompatConfig::default_list_count`.
    pub count: Option<u32>,
    /// Defaults to 0.
    pub offset: Option<u64>,
}

/// List member listings (`Lists::get_contacts`, `Lists::get_recent_contacts`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipOptions {
    pub count: Option<u32>,
    pub vid_offset: Option<String>,
    /// Contact properties to fetch; empty means `CompatConfig::membership_properties`.
    pub properties: Vec<String>,
}

/// Contact property definitions listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyOptions {
    pub archived: Option<bool>,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerOptions {
    pub email: Option<String>,
    /// Page size of each underlying request.
    pub limit: Option<u32>,
    pub archived: Option<bool>,
}
