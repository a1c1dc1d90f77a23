// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search clause builder.
//!
//! Replaces the host's search `WHERE` fragment with one that matches each
//! term against the post columns, every discovered metadata key, and the term
//! names of every discovered taxonomy.
//!
//! ```text
//! "annual report"
//!     │
//!     ├─ "annual" → (title OR content OR excerpt OR meta… OR tax…)
//!     └─ "report" → (title OR content OR excerpt OR meta… OR tax…)
//!                     │
//!                     └─→ " AND (<g1> OR <g2>)" [+ " AND (posts.post_password = '')"]
//! ```

use std::sync::Arc;

use tracing::debug;

use super::discovery::Discoverer;
use super::query_builder::{PostColumn, Query, QueryBuilder, QueryNode};
use super::sql_translator::SqlTranslator;
use crate::config::AugmentConfig;
use crate::context::{RequestContext, SearchFields};
use crate::hooks::SearchHooks;
use crate::metrics;
use crate::query::{Relation, SearchQuery};

/// Post columns every term is matched against.
const SEARCH_COLUMNS: [PostColumn; 3] =
    [PostColumn::Title, PostColumn::Content, PostColumn::Excerpt];

/// Split a phrase into trimmed, non-empty terms.
pub fn tokenize(phrase: &str) -> Vec<&str> {
    phrase.split_whitespace().collect()
}

pub struct SearchClauseBuilder {
    config: Arc<AugmentConfig>,
    discoverer: Arc<Discoverer>,
    hooks: Arc<dyn SearchHooks>,
}

impl SearchClauseBuilder {
    pub fn new(
        config: Arc<AugmentConfig>,
        discoverer: Arc<Discoverer>,
        hooks: Arc<dyn SearchHooks>,
    ) -> Self {
        Self {
            config,
            discoverer,
            hooks,
        }
    }

    /// One OR group per term over the given fields.
    pub fn term_groups(terms: &[&str], fields: &SearchFields) -> Vec<QueryNode> {
        terms
            .iter()
            .filter_map(|term| {
                let mut group = QueryBuilder::new();
                for column in SEARCH_COLUMNS {
                    group = group.post_contains(column, *term);
                }
                for key in &fields.meta_keys {
                    group = group.meta_contains(key.as_str(), *term);
                }
                for taxonomy in &fields.taxonomies {
                    group = group.taxonomy_contains(taxonomy.as_str(), *term);
                }
                group.build(Relation::Or).map(|q| q.root)
            })
            .collect()
    }

    /// Build the search condition AST for a phrase, or `None` when it has no terms.
    pub fn build_query(
        &self,
        phrase: &str,
        relation: Relation,
        fields: &SearchFields,
    ) -> Option<Query> {
        let terms = tokenize(phrase);
        QueryNode::group(relation, Self::term_groups(&terms, fields)).map(Query::new)
    }

    /// The replacement search fragment for `query`, or `existing` when the
    /// query is not a front-end keyword search.
    pub fn build_search_sql(
        &self,
        existing: &str,
        query: &SearchQuery,
        ctx: &mut RequestContext,
    ) -> String {
        if !query.is_search || !ctx.is_frontend() {
            return existing.to_string();
        }
        let Some(phrase) = query.keyword() else {
            return existing.to_string();
        };
        let terms = tokenize(phrase);
        if terms.is_empty() {
            return existing.to_string();
        }

        let relation = self.hooks.terms_relation(self.config.terms_relation);
        let fields = SearchFields {
            meta_keys: self.discoverer.searchable_meta_keys(),
            taxonomies: self.discoverer.searchable_taxonomies(),
        };
        let groups = Self::term_groups(&terms, &fields);
        let posts = self.config.posts_table();

        let rendered: Vec<String> = groups
            .iter()
            .map(|node| SqlTranslator::translate(&Query::new(node.clone()), &posts))
            .collect();
        let mut sql = format!(" AND ({})", rendered.join(&format!(" {relation} ")));

        let Some(mut clause) = QueryNode::group(relation, groups).map(Query::new) else {
            return existing.to_string();
        };
        if !ctx.is_authenticated {
            let password = Query::post_eq(PostColumn::Password, "");
            sql.push_str(" AND ");
            sql.push_str(&SqlTranslator::translate(&password, &posts));
            clause = clause.and(password);
        }

        metrics::record_search_clauses(terms.len(), clause.clause_count());
        debug!(
            terms = terms.len(),
            meta_keys = fields.meta_keys.len(),
            taxonomies = fields.taxonomies.len(),
            %relation,
            "Built search clauses"
        );
        ctx.record_search(clause, fields);

        self.hooks.posts_search(sql, query)
    }
}
