// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field and taxonomy discovery.
//!
//! Finds the metadata keys and taxonomies worth searching, drops anything that
//! looks sensitive, and caches both lists. The metadata key list is dropped
//! eagerly whenever post metadata changes; the taxonomy list only expires.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{read_through, TransientStore};
use crate::config::AugmentConfig;
use crate::hooks::SearchHooks;
use crate::metrics;
use crate::params::sanitize_key;
use crate::storage::traits::{MetaKeyScan, MetaStore, Registry, TaxonomyArgs};

/// Cache key for the discovered metadata keys.
pub const CACHE_KEY_META: &str = "search_augment_meta_keys";
/// Cache key for the discovered taxonomies.
pub const CACHE_KEY_TAX: &str = "search_augment_taxonomies";

/// Metadata change notifications from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaChange {
    Added,
    Updated,
    Deleted,
}

pub struct Discoverer {
    config: Arc<AugmentConfig>,
    meta: Arc<dyn MetaStore>,
    registry: Arc<dyn Registry>,
    cache: Arc<dyn TransientStore>,
    hooks: Arc<dyn SearchHooks>,
}

impl Discoverer {
    pub fn new(
        config: Arc<AugmentConfig>,
        meta: Arc<dyn MetaStore>,
        registry: Arc<dyn Registry>,
        cache: Arc<dyn TransientStore>,
        hooks: Arc<dyn SearchHooks>,
    ) -> Self {
        Self {
            config,
            meta,
            registry,
            cache,
            hooks,
        }
    }

    /// Metadata keys eligible for search. Empty on any failure.
    pub fn searchable_meta_keys(&self) -> Vec<String> {
        read_through(
            self.cache.as_ref(),
            "meta_keys",
            CACHE_KEY_META,
            self.config.meta_keys_ttl(),
            || self.discover_meta_keys(),
        )
    }

    /// Taxonomies eligible for search.
    pub fn searchable_taxonomies(&self) -> Vec<String> {
        read_through(
            self.cache.as_ref(),
            "taxonomies",
            CACHE_KEY_TAX,
            self.config.taxonomies_ttl(),
            || Some(self.discover_taxonomies()),
        )
    }

    /// Drop the cached metadata key list.
    pub fn clear_meta_cache(&self) {
        match self.cache.delete(CACHE_KEY_META) {
            Ok(()) => info!("Metadata key cache cleared"),
            Err(e) => warn!(error = %e, "Failed to clear metadata key cache"),
        }
    }

    /// Any metadata add/update/delete invalidates the key list.
    pub fn on_meta_changed(&self, change: MetaChange) {
        debug!(?change, "Post metadata changed");
        self.clear_meta_cache();
    }

    fn discover_meta_keys(&self) -> Option<Vec<String>> {
        let scan = MetaKeyScan::from_config(&self.config);
        let raw = match self.meta.distinct_meta_keys(&scan) {
            Ok(keys) => keys,
            Err(e) => {
                metrics::record_discovery_failure("meta_keys");
                warn!(error = %e, "Metadata key discovery failed, searching without metadata");
                return None;
            }
        };

        let keys: Vec<String> = raw
            .iter()
            .filter(|k| scan.accepts(k))
            .take(scan.limit)
            .map(|k| sanitize_key(k))
            .filter(|k| !k.is_empty())
            .collect();
        let keys = filter_metadata_keys(keys, &self.config.excluded_key_patterns);
        let keys = self.hooks.auto_meta_keys(keys);

        metrics::record_discovery("meta_keys", keys.len());
        debug!(count = keys.len(), "Discovered searchable metadata keys");
        Some(keys)
    }

    fn discover_taxonomies(&self) -> Vec<String> {
        let args = self.hooks.taxonomy_args(TaxonomyArgs::searchable());
        let matched = self
            .registry
            .taxonomies()
            .into_iter()
            .filter(|t| args.matches(t))
            .collect();
        let names = self
            .hooks
            .taxonomy_objects(matched)
            .into_iter()
            .map(|t| sanitize_key(&t.name))
            .filter(|name| !name.is_empty())
            .collect();
        let names = self.hooks.auto_taxonomies(names);

        metrics::record_discovery("taxonomies", names.len());
        debug!(count = names.len(), "Discovered searchable taxonomies");
        names
    }
}

/// True when `key` contains any of `patterns`, ignoring case.
pub fn is_excluded_key(key: &str, patterns: &[String]) -> bool {
    let key = key.to_lowercase();
    patterns
        .iter()
        .any(|p| !p.is_empty() && key.contains(&p.to_lowercase()))
}

/// Remove sensitive or unwanted metadata keys.
pub fn filter_metadata_keys(keys: Vec<String>, patterns: &[String]) -> Vec<String> {
    keys.into_iter()
        .filter(|k| !is_excluded_key(k, patterns))
        .collect()
}
