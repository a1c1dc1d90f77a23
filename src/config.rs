// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the search augmenter.
//!
//! # Example
//!
//! ```
//! use search_augment::AugmentConfig;
//!
//! // Minimal config (uses defaults)
//! let config = AugmentConfig::default();
//! assert_eq!(config.max_meta_keys, 50);
//! assert_eq!(config.posts_table(), "wp_posts");
//!
//! // Custom table prefix and shorter discovery TTL
//! let config = AugmentConfig {
//!     table_prefix: "site2_".into(),
//!     meta_keys_ttl_secs: 600,
//!     ..Default::default()
//! };
//! assert_eq!(config.postmeta_table(), "site2_postmeta");
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::AugmentError;
use crate::query::Relation;

/// Configuration for the search augmenter.
///
/// All fields have defaults matching a stock CMS install, so an empty
/// document deserializes into a working config.
#[derive(Debug, Clone, Deserialize)]
pub struct AugmentConfig {
    /// Database table prefix (e.g., "wp_")
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Discovered metadata key list TTL (default: 1 hour)
    #[serde(default = "default_list_ttl_secs")]
    pub meta_keys_ttl_secs: u64,

    /// Discovered taxonomy list TTL (default: 1 hour)
    #[serde(default = "default_list_ttl_secs")]
    pub taxonomies_ttl_secs: u64,

    /// Per-field possible value list TTL (default: 5 minutes)
    #[serde(default = "default_meta_values_ttl_secs")]
    pub meta_values_ttl_secs: u64,

    /// Maximum number of metadata keys included in search
    #[serde(default = "default_max_meta_keys")]
    pub max_meta_keys: usize,

    /// Case-insensitive substrings that exclude a metadata key from search
    #[serde(default = "default_excluded_key_patterns")]
    pub excluded_key_patterns: Vec<String>,

    /// Keys starting with this marker are internal and never discovered
    #[serde(default = "default_internal_key_prefix")]
    pub internal_key_prefix: String,

    /// URL parameter prefix for taxonomy filters
    #[serde(default = "default_taxonomy_param_prefix")]
    pub taxonomy_param_prefix: String,

    /// URL parameter prefix for metadata filters
    #[serde(default = "default_metadata_param_prefix")]
    pub metadata_param_prefix: String,

    /// Relation used to combine per-term clause groups
    #[serde(default = "default_terms_relation")]
    pub terms_relation: Relation,

    /// The host's generic post type; filters may replace it with a narrower one
    #[serde(default = "default_post_type")]
    pub default_post_type: String,

    /// Post type assumed by metadata filters when the page names none
    #[serde(default = "default_meta_filter_post_type")]
    pub meta_filter_fallback_post_type: String,

    /// Option holding the page-level default sort configuration
    #[serde(default = "default_sort_config_option")]
    pub sort_config_option: String,
}

fn default_table_prefix() -> String { "wp_".into() }
fn default_list_ttl_secs() -> u64 { 3600 }
fn default_meta_values_ttl_secs() -> u64 { 300 }
fn default_max_meta_keys() -> usize { 50 }
fn default_excluded_key_patterns() -> Vec<String> {
    [
        "password",
        "token",
        "secret",
        "api_key",
        "private",
        "session",
        "nonce",
        "wp_",
        "woocommerce_",
    ]
    .iter()
    .map(|p| (*p).to_string())
    .collect()
}
fn default_internal_key_prefix() -> String { "_".into() }
fn default_taxonomy_param_prefix() -> String { "taxonomy_".into() }
fn default_metadata_param_prefix() -> String { "metadata_".into() }
fn default_terms_relation() -> Relation { Relation::Or }
fn default_post_type() -> String { "post".into() }
fn default_meta_filter_post_type() -> String { "document".into() }
fn default_sort_config_option() -> String { "search_augment_sort_block_config".into() }

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            meta_keys_ttl_secs: default_list_ttl_secs(),
            taxonomies_ttl_secs: default_list_ttl_secs(),
            meta_values_ttl_secs: default_meta_values_ttl_secs(),
            max_meta_keys: default_max_meta_keys(),
            excluded_key_patterns: default_excluded_key_patterns(),
            internal_key_prefix: default_internal_key_prefix(),
            taxonomy_param_prefix: default_taxonomy_param_prefix(),
            metadata_param_prefix: default_metadata_param_prefix(),
            terms_relation: default_terms_relation(),
            default_post_type: default_post_type(),
            meta_filter_fallback_post_type: default_meta_filter_post_type(),
            sort_config_option: default_sort_config_option(),
        }
    }
}

impl AugmentConfig {
    /// Check the values that end up inside generated SQL.
    pub fn validate(&self) -> Result<(), AugmentError> {
        if !self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AugmentError::InvalidConfig(format!(
                "table_prefix '{}' may only contain [A-Za-z0-9_]",
                self.table_prefix
            )));
        }
        if self.max_meta_keys == 0 {
            return Err(AugmentError::InvalidConfig(
                "max_meta_keys must be greater than zero".into(),
            ));
        }
        if self.taxonomy_param_prefix.is_empty() || self.metadata_param_prefix.is_empty() {
            return Err(AugmentError::InvalidConfig(
                "filter parameter prefixes must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn posts_table(&self) -> String {
        format!("{}posts", self.table_prefix)
    }

    pub fn postmeta_table(&self) -> String {
        format!("{}postmeta", self.table_prefix)
    }

    pub fn term_relationships_table(&self) -> String {
        format!("{}term_relationships", self.table_prefix)
    }

    pub fn term_taxonomy_table(&self) -> String {
        format!("{}term_taxonomy", self.table_prefix)
    }

    pub fn terms_table(&self) -> String {
        format!("{}terms", self.table_prefix)
    }

    pub fn meta_keys_ttl(&self) -> Duration {
        Duration::from_secs(self.meta_keys_ttl_secs)
    }

    pub fn taxonomies_ttl(&self) -> Duration {
        Duration::from_secs(self.taxonomies_ttl_secs)
    }

    pub fn meta_values_ttl(&self) -> Duration {
        Duration::from_secs(self.meta_values_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AugmentConfig::default();
        assert_eq!(config.meta_keys_ttl(), Duration::from_secs(3600));
        assert_eq!(config.taxonomies_ttl(), Duration::from_secs(3600));
        assert_eq!(config.meta_values_ttl(), Duration::from_secs(300));
        assert_eq!(config.terms_relation, Relation::Or);
        assert_eq!(config.excluded_key_patterns.len(), 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AugmentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.table_prefix, "wp_");
        assert_eq!(config.meta_filter_fallback_post_type, "document");
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: AugmentConfig = serde_json::from_str(
            r#"{"table_prefix": "blog_", "terms_relation": "AND", "max_meta_keys": 10}"#,
        )
        .unwrap();
        assert_eq!(config.terms_table(), "blog_terms");
        assert_eq!(config.terms_relation, Relation::And);
        assert_eq!(config.max_meta_keys, 10);
    }

    #[test]
    fn test_validate_rejects_unsafe_prefix() {
        let config = AugmentConfig {
            table_prefix: "wp_; DROP TABLE x".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AugmentError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_key_cap() {
        let config = AugmentConfig {
            max_meta_keys: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
