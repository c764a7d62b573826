//! Client-wide configuration.
//!
//! Every field has a default, so a config can be deserialized from a partial
//! document (or built with `..Default::default()`). `validate` is called once
//! by `CrmClient::with_config`.

use serde::Deserialize;

use crate::error::ApiError;
use crate::ordered::CollisionPolicy;

/// The remote batch-read endpoint rejects more ids than this per call.
pub const MAX_BATCH_READ_LIMIT: usize = 100;

pub const DEFAULT_BASE_PATH: &str = "/crm/v3";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Prefix of every modern path, e.g. `/crm/v3`.
    pub base_path: String,
    /// Ids per batch-read call when densifying memberships.
    pub batch_read_limit: usize,
    /// Page size for search and the sorted contact listings.
    pub default_page_size: u32,
    /// Page size for list search.
    pub default_list_count: u32,
    /// Properties fetched for list members when the caller names none.
    pub membership_properties: Vec<String>,
    /// What to do when two batch results map to the same `vid`.
    pub batch_key_collision: CollisionPolicy,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            batch_read_limit: MAX_BATCH_READ_LIMIT,
            default_page_size: 100,
            default_list_count: 20,
            membership_properties: vec![
                "email".to_string(),
                "firstname".to_string(),
                "lastname".to_string(),
            ],
            batch_key_collision: CollisionPolicy::KeepLast,
        }
    }
}

impl CompatConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.batch_read_limit == 0 || self.batch_read_limit > MAX_BATCH_READ_LIMIT {
            return Err(ApiError::InvalidConfig(format!(
                "batch_read_limit must be between 1 and {MAX_BATCH_READ_LIMIT}, got {}",
                self.batch_read_limit
            )));
        }
        if self.default_page_size == 0 {
            return Err(ApiError::InvalidConfig("default_page_size must be positive".to_string()));
        }
        if self.default_list_count == 0 {
            return Err(ApiError::InvalidConfig("default_list_count must be positive".to_string()));
        }
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(ApiError::InvalidConfig(format!(
                "base_path must start with '/', got {:?}",
                self.base_path
            )));
        }
        Ok(())
    }

    /// Base path without a trailing slash.
    pub fn normalized_base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CompatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_read_limit, 100);
        assert_eq!(config.membership_properties, vec!["email", "firstname", "lastname"]);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let raw = r#"{"batch_read_limit": 50, "batch_key_collision": "reject"}"#;
        let config: CompatConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.batch_read_limit, 50);
        assert_eq!(config.batch_key_collision, CollisionPolicy::Reject);
        assert_eq!(config.base_path, "/crm/v3");
    }

    #[test]
    fn batch_limit_above_ceiling_is_rejected() {
        let config = CompatConfig {
            batch_read_limit: 101,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ApiError::InvalidConfig(_))));

        let config = CompatConfig {
            batch_read_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_path_trailing_slash_is_stripped() {
        let config = CompatConfig {
            base_path: "/crm/v3/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.normalized_base_path(), "/crm/v3");
    }

    #[test]
    fn relative_base_path_is_rejected() {
        let config = CompatConfig {
            base_path: "crm/v3".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
