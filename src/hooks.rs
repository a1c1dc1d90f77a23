// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Extensibility hooks.
//!
//! Each method receives the value the augmenter computed and returns the value
//! to use instead. Every default is the identity, so hosts override only the
//! hooks they need.

use crate::query::{Relation, SearchQuery};
use crate::storage::traits::{TaxonomyArgs, TaxonomyInfo};

pub trait SearchHooks: Send + Sync {
    /// Final list of discovered metadata keys, before caching.
    fn auto_meta_keys(&self, keys: Vec<String>) -> Vec<String> {
        keys
    }

    /// Registry arguments used to find searchable taxonomies.
    fn taxonomy_args(&self, args: TaxonomyArgs) -> TaxonomyArgs {
        args
    }

    /// Taxonomy objects matched by the registry arguments.
    fn taxonomy_objects(&self, taxonomies: Vec<TaxonomyInfo>) -> Vec<TaxonomyInfo> {
        taxonomies
    }

    /// Final list of discovered taxonomy names, before caching.
    fn auto_taxonomies(&self, names: Vec<String>) -> Vec<String> {
        names
    }

    /// Relation combining the per-term clause groups.
    fn terms_relation(&self, relation: Relation) -> Relation {
        relation
    }

    /// The finished search fragment.
    fn posts_search(&self, sql: String, _query: &SearchQuery) -> String {
        sql
    }
}

/// Hooks that change nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl SearchHooks for NoopHooks {}
