// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Host collaborator traits.
//!
//! The augmenter never owns content. It reads metadata, the taxonomy and post
//! type registry, and persisted options through these traits, all of which are
//! synchronous, blocking calls into the host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AugmentConfig;
use crate::search::sql_translator::quote_literal;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Item not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Request for the distinct metadata keys of published content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaKeyScan {
    /// Keys starting with this marker are skipped
    pub exclude_prefix: String,
    /// Maximum number of keys, taken in ascending key order
    pub limit: usize,
}

impl MetaKeyScan {
    pub fn from_config(config: &AugmentConfig) -> Self {
        Self {
            exclude_prefix: config.internal_key_prefix.clone(),
            limit: config.max_meta_keys,
        }
    }

    /// True when a stored key is eligible for this scan.
    pub fn accepts(&self, key: &str) -> bool {
        !key.is_empty()
            && (self.exclude_prefix.is_empty() || !key.starts_with(&self.exclude_prefix))
    }

    /// The scan as a MySQL statement, for hosts backed by a SQL store.
    pub fn to_sql(&self, config: &AugmentConfig) -> String {
        let pattern = format!("{}%", crate::search::sql_translator::esc_like(&self.exclude_prefix));
        format!(
            "SELECT DISTINCT pm.meta_key FROM {postmeta} pm \
             INNER JOIN {posts} p ON pm.post_id = p.ID \
             WHERE pm.meta_key NOT LIKE {pattern} \
             AND p.post_status = 'publish' \
             AND pm.meta_value != '' \
             ORDER BY pm.meta_key ASC \
             LIMIT {limit}",
            postmeta = config.postmeta_table(),
            posts = config.posts_table(),
            pattern = quote_literal(&pattern),
            limit = self.limit,
        )
    }
}

/// Read access to post metadata.
pub trait MetaStore: Send + Sync {
    /// Distinct keys with a non-empty value on published content, ascending,
    /// filtered and capped per the scan.
    fn distinct_meta_keys(&self, scan: &MetaKeyScan) -> Result<Vec<String>, StoreError>;

    /// Distinct non-empty values of `key` on published content of `post_type`,
    /// ascending.
    fn distinct_meta_values(&self, post_type: &str, key: &str) -> Result<Vec<String>, StoreError>;

    /// Whether any content of `post_type` carries `key`.
    fn meta_key_exists(&self, post_type: &str, key: &str) -> Result<bool, StoreError>;
}

/// A registered taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyInfo {
    pub name: String,
    /// Post types this taxonomy is attached to
    pub object_types: Vec<String>,
    pub public: bool,
    pub show_ui: bool,
}

impl TaxonomyInfo {
    /// A public taxonomy with UI attached to the given post types.
    pub fn public(name: impl Into<String>, object_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            object_types: object_types.iter().map(|t| (*t).to_string()).collect(),
            public: true,
            show_ui: true,
        }
    }
}

/// A registered post type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTypeInfo {
    pub name: String,
    pub public: bool,
}

/// Registry lookup arguments; `None` matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaxonomyArgs {
    pub public: Option<bool>,
    pub show_ui: Option<bool>,
}

impl TaxonomyArgs {
    /// Public taxonomies that have a UI.
    pub fn searchable() -> Self {
        Self {
            public: Some(true),
            show_ui: Some(true),
        }
    }

    pub fn matches(&self, taxonomy: &TaxonomyInfo) -> bool {
        self.public.map_or(true, |p| p == taxonomy.public)
            && self.show_ui.map_or(true, |s| s == taxonomy.show_ui)
    }
}

/// Taxonomy and post type registry.
pub trait Registry: Send + Sync {
    fn taxonomies(&self) -> Vec<TaxonomyInfo>;

    fn post_types(&self) -> Vec<PostTypeInfo>;

    fn taxonomy(&self, name: &str) -> Option<TaxonomyInfo> {
        self.taxonomies().into_iter().find(|t| t.name == name)
    }

    fn taxonomy_exists(&self, name: &str) -> bool {
        self.taxonomy(name).is_some()
    }

    fn post_type(&self, name: &str) -> Option<PostTypeInfo> {
        self.post_types().into_iter().find(|p| p.name == name)
    }

    /// Names of the taxonomies attached to `post_type`.
    fn object_taxonomies(&self, post_type: &str) -> Vec<String> {
        self.taxonomies()
            .into_iter()
            .filter(|t| t.object_types.iter().any(|o| o == post_type))
            .map(|t| t.name)
            .collect()
    }
}

/// Persisted site options.
pub trait OptionStore: Send + Sync {
    fn get_option(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError>;
}
