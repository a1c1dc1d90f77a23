// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Join injection for the search fragment.
//!
//! The metadata and taxonomy clauses reference aliased tables that the host
//! query does not join on its own. The joins are added only after a search
//! fragment was built for the same request, and only once per fragment.

use std::sync::Arc;

use tracing::debug;

use super::sql_translator::{META_ALIAS, TERMS_ALIAS, TERM_RELATIONSHIPS_ALIAS, TERM_TAXONOMY_ALIAS};
use crate::config::AugmentConfig;
use crate::context::RequestContext;

pub struct JoinInjector {
    config: Arc<AugmentConfig>,
}

impl JoinInjector {
    pub fn new(config: Arc<AugmentConfig>) -> Self {
        Self { config }
    }

    /// Postmeta join for metadata clauses.
    pub fn meta_join(&self) -> String {
        format!(
            " LEFT JOIN {meta} {META_ALIAS} ON ({posts}.ID = {META_ALIAS}.post_id)",
            meta = self.config.postmeta_table(),
            posts = self.config.posts_table(),
        )
    }

    /// The three term table joins for taxonomy clauses.
    pub fn taxonomy_joins(&self) -> String {
        format!(
            " LEFT JOIN {rel} {r} ON ({posts}.ID = {r}.object_id) \
             LEFT JOIN {tt} {t} ON ({r}.term_taxonomy_id = {t}.term_taxonomy_id) \
             LEFT JOIN {terms} {n} ON ({t}.term_id = {n}.term_id)",
            r = TERM_RELATIONSHIPS_ALIAS,
            t = TERM_TAXONOMY_ALIAS,
            n = TERMS_ALIAS,
            rel = self.config.term_relationships_table(),
            tt = self.config.term_taxonomy_table(),
            terms = self.config.terms_table(),
            posts = self.config.posts_table(),
        )
    }

    /// Append the joins the request's search fragment needs.
    pub fn inject_joins(&self, existing: &str, ctx: &mut RequestContext) -> String {
        if !ctx.clauses_built() || ctx.joins_injected() {
            return existing.to_string();
        }

        let mut join = existing.to_string();
        let fields = ctx.search_fields();
        if !fields.meta_keys.is_empty() {
            push_once(&mut join, &self.meta_join());
        }
        if !fields.taxonomies.is_empty() {
            push_once(&mut join, &self.taxonomy_joins());
        }
        debug!(
            meta = !fields.meta_keys.is_empty(),
            taxonomy = !fields.taxonomies.is_empty(),
            "Injected search joins"
        );
        ctx.mark_joins_injected();
        join
    }

    /// Force `DISTINCT` once joins may multiply rows.
    pub fn force_distinct(&self, existing: &str, ctx: &RequestContext) -> String {
        if ctx.clauses_built() {
            "DISTINCT".to_string()
        } else {
            existing.to_string()
        }
    }
}

/// Append `fragment` unless the join string already carries it.
fn push_once(join: &mut String, fragment: &str) {
    if !join.contains(fragment.trim_start()) {
        join.push_str(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SearchFields;
    use crate::search::Query;
    use crate::search::PostColumn;

    fn injector() -> JoinInjector {
        JoinInjector::new(Arc::new(AugmentConfig::default()))
    }

    fn searched_ctx(meta: &[&str], taxonomies: &[&str]) -> RequestContext {
        let mut ctx = RequestContext::new();
        ctx.record_search(
            Query::post_contains(PostColumn::Title, "x"),
            SearchFields {
                meta_keys: meta.iter().map(|s| s.to_string()).collect(),
                taxonomies: taxonomies.iter().map(|s| s.to_string()).collect(),
            },
        );
        ctx
    }

    #[test]
    fn test_no_joins_without_search_clauses() {
        let mut ctx = RequestContext::new();
        assert_eq!(injector().inject_joins(" JOIN x", &mut ctx), " JOIN x");
        assert_eq!(injector().force_distinct("", &ctx), "");
    }

    #[test]
    fn test_meta_and_taxonomy_joins() {
        let mut ctx = searched_ctx(&["color"], &["category"]);
        let join = injector().inject_joins("", &mut ctx);
        assert_eq!(
            join,
            " LEFT JOIN wp_postmeta espm ON (wp_posts.ID = espm.post_id) \
             LEFT JOIN wp_term_relationships estr ON (wp_posts.ID = estr.object_id) \
             LEFT JOIN wp_term_taxonomy estt ON (estr.term_taxonomy_id = estt.term_taxonomy_id) \
             LEFT JOIN wp_terms est ON (estt.term_id = est.term_id)"
        );
        assert_eq!(injector().force_distinct("", &ctx), "DISTINCT");
    }

    #[test]
    fn test_joins_follow_discovered_fields() {
        let mut ctx = searched_ctx(&[], &["category"]);
        let join = injector().inject_joins("", &mut ctx);
        assert!(!join.contains("espm"));
        assert!(join.contains("LEFT JOIN wp_terms est"));

        let mut ctx = searched_ctx(&[], &[]);
        assert_eq!(injector().inject_joins("", &mut ctx), "");
    }

    #[test]
    fn test_injected_once_per_request() {
        let injector = injector();
        let mut ctx = searched_ctx(&["color"], &["category"]);
        let first = injector.inject_joins("", &mut ctx);
        let second = injector.inject_joins(&first, &mut ctx);
        assert_eq!(first, second);
        assert_eq!(second.matches("LEFT JOIN wp_postmeta espm").count(), 1);
    }

    #[test]
    fn test_second_search_in_request_gets_joins() {
        let injector = injector();
        let mut ctx = searched_ctx(&["color"], &["category"]);
        let first = injector.inject_joins("", &mut ctx);
        assert_eq!(injector.inject_joins("", &mut ctx), "");

        ctx.record_search(
            Query::post_contains(PostColumn::Title, "y"),
            SearchFields {
                meta_keys: vec!["color".into()],
                taxonomies: vec![],
            },
        );
        let second = injector.inject_joins("", &mut ctx);
        assert!(second.contains("LEFT JOIN wp_postmeta espm"));
        assert!(!second.contains("estt"));
        assert!(first.contains("estt"));
    }

    #[test]
    fn test_existing_joins_not_duplicated_across_contexts() {
        let injector = injector();
        let mut first_ctx = searched_ctx(&["color"], &[]);
        let join = injector.inject_joins("", &mut first_ctx);

        let mut second_ctx = searched_ctx(&["color"], &[]);
        let join = injector.inject_joins(&join, &mut second_ctx);
        assert_eq!(join.matches("LEFT JOIN").count(), 1);
    }
}
