// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metadata filter resolver.
//!
//! Turns `metadata_<field>=<values>` request parameters into metadata filter
//! clauses on the main query. The post type is taken from the metadata filter
//! block on the page being rendered.

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{debug, warn};

use super::meta_query::{MetaClause, MetaQuery};
use crate::blocks::{walk, Block, BlockVisitor, ContentObject};
use crate::cache::{read_through, TransientStore};
use crate::config::AugmentConfig;
use crate::context::RequestContext;
use crate::metrics;
use crate::params::{sanitize_text_field, RequestParams};
use crate::query::{Relation, SearchQuery};
use crate::storage::traits::MetaStore;

/// One requested metadata filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field_name: String,
    pub values: Vec<String>,
}

/// Finds the post type named by the first metadata filter block.
struct FilterPostType;

impl BlockVisitor for FilterPostType {
    type Output = String;

    fn visit(&mut self, block: &Block) -> ControlFlow<String> {
        let Block::MetadataFilter {
            selected_metadata: Some(selected),
            ..
        } = block
        else {
            return ControlFlow::Continue(());
        };
        match split_selection(selected) {
            Some((post_type, _)) => ControlFlow::Break(post_type.to_string()),
            None => ControlFlow::Continue(()),
        }
    }
}

/// `posttype:field` → (`posttype`, `field`); anything else is not a selection.
pub fn split_selection(selected: &str) -> Option<(&str, &str)> {
    let mut parts = selected.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(post_type), Some(field), None) if !post_type.is_empty() => Some((post_type, field)),
        _ => None,
    }
}

/// Candidate stored keys for a filter field name, in lookup order.
pub fn key_variants(field_name: &str) -> Vec<String> {
    let candidates = [
        Some(field_name.to_string()),
        Some(format!("{field_name}_select")),
        Some(format!("{field_name}_filter")),
        field_name.strip_suffix("_select").map(str::to_string),
        field_name.strip_suffix("_filter").map(str::to_string),
    ];
    let mut variants: Vec<String> = Vec::new();
    for candidate in candidates.into_iter().flatten() {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

pub struct MetadataFilterResolver {
    config: Arc<AugmentConfig>,
    meta: Arc<dyn MetaStore>,
    cache: Arc<dyn TransientStore>,
}

impl MetadataFilterResolver {
    pub fn new(
        config: Arc<AugmentConfig>,
        meta: Arc<dyn MetaStore>,
        cache: Arc<dyn TransientStore>,
    ) -> Self {
        Self { config, meta, cache }
    }

    /// Requested filters, in parameter order. Fields without values are skipped.
    pub fn resolve_meta_filters(&self, params: &RequestParams) -> Vec<MetadataFilter> {
        params
            .iter()
            .filter_map(|(key, value)| {
                let field_name = key.strip_prefix(self.config.metadata_param_prefix.as_str())?;
                if field_name.is_empty() || value.is_empty() {
                    return None;
                }
                let values: Vec<String> = value
                    .as_list()
                    .iter()
                    .map(|v| sanitize_text_field(v))
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    metrics::record_filter_dropped("metadata", "empty_values");
                    return None;
                }
                Some(MetadataFilter {
                    field_name: field_name.to_string(),
                    values,
                })
            })
            .collect()
    }

    /// Post type named by the page's first metadata filter block, or the
    /// configured fallback.
    pub fn resolve_post_type_for_meta_filters(&self, content: Option<&ContentObject>) -> String {
        content
            .and_then(|c| walk(&c.blocks, &mut FilterPostType))
            .unwrap_or_else(|| self.config.meta_filter_fallback_post_type.clone())
    }

    /// The stored key a filter field refers to. Falls back to the field name.
    pub fn find_actual_meta_key(&self, post_type: &str, field_name: &str) -> String {
        for candidate in key_variants(field_name) {
            match self.meta.meta_key_exists(post_type, &candidate) {
                Ok(true) => return candidate,
                Ok(false) => {}
                Err(e) => {
                    warn!(post_type, key = %candidate, error = %e, "Meta key lookup failed");
                }
            }
        }
        field_name.to_string()
    }

    /// Apply request metadata filters to the main front-end query.
    pub fn apply(&self, query: &mut SearchQuery, ctx: &RequestContext) {
        if ctx.is_admin || !query.is_main_query {
            return;
        }

        let filters = match &ctx.params {
            Some(params) => self.resolve_meta_filters(params),
            None => self.resolve_meta_filters(&self.params_from_query_vars(query)),
        };
        if filters.is_empty() {
            return;
        }

        let post_type = self.resolve_post_type_for_meta_filters(ctx.content.as_ref());
        if query.post_type_is_default(&self.config.default_post_type) {
            query.set_post_type(post_type.clone());
        }

        let mut additions = MetaQuery::new(Relation::And);
        for filter in filters {
            let key = self.find_actual_meta_key(&post_type, &filter.field_name);
            debug!(
                field = %filter.field_name,
                %key,
                values = filter.values.len(),
                "Applied metadata filter"
            );
            metrics::record_filter_applied("metadata");
            additions.push(MetaClause::matching(key, filter.values));
        }
        query.meta_query = Some(MetaQuery::merge_and(query.meta_query.take(), additions));
    }

    /// Distinct published values of a field, for building filter options.
    pub fn possible_values(&self, post_type: &str, field_name: &str) -> Vec<String> {
        if post_type.is_empty() || field_name.is_empty() {
            return Vec::new();
        }
        let key = format!("metadata_values_{post_type}_{field_name}");
        read_through(
            self.cache.as_ref(),
            "meta_values",
            &key,
            self.config.meta_values_ttl(),
            || match self.meta.distinct_meta_values(post_type, field_name) {
                Ok(values) => Some(values.into_iter().filter(|v| !v.is_empty()).collect()),
                Err(e) => {
                    warn!(post_type, field = field_name, error = %e, "Meta value lookup failed");
                    None
                }
            },
        )
    }

    fn params_from_query_vars(&self, query: &SearchQuery) -> RequestParams {
        query
            .vars
            .iter()
            .filter(|(k, _)| k.starts_with(self.config.metadata_param_prefix.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{parse_blocks, METADATA_FILTER_BLOCK};
    use crate::cache::TtlCache;
    use crate::filter::meta_query::{MetaCompare, MetaQueryNode};
    use crate::params::ParamValue;
    use crate::storage::memory::{InMemoryStore, Post};
    use serde_json::json;

    fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.register_post_type("post", true);
        store.register_post_type("document", true);
        store.insert_post(Post::published(1, "document", "A").with_meta("department_select", "HR"));
        store.insert_post(Post::published(2, "document", "B").with_meta("color", "red"));
        store.insert_post(Post::published(3, "document", "C").with_meta("color", "blue"));
        store.insert_post(Post::published(4, "document", "D").with_meta("color", "red"));
        store.insert_post(Post::draft(5, "document", "E").with_meta("color", "green"));
        store.insert_post(Post::published(6, "post", "F").with_meta("color", "teal"));
        Arc::new(store)
    }

    fn resolver_with(store: Arc<InMemoryStore>) -> MetadataFilterResolver {
        let config = Arc::new(AugmentConfig::default());
        MetadataFilterResolver::new(config, store, Arc::new(TtlCache::new()))
    }

    fn resolver() -> MetadataFilterResolver {
        resolver_with(store())
    }

    fn page_with_filter(selected: &str) -> ContentObject {
        ContentObject::new(
            10,
            parse_blocks(json!([
                {"blockName": "core/columns", "innerBlocks": [
                    {"blockName": "core/column", "innerBlocks": [
                        {
                            "blockName": METADATA_FILTER_BLOCK,
                            "attrs": {"selectedMetadata": selected}
                        }
                    ]}
                ]}
            ])),
        )
    }

    #[test]
    fn test_resolve_filters_from_list_and_comma_values() {
        let params = RequestParams::parse(
            "metadata_color=red,blue&metadata_size[]=L&metadata_size[]=&metadata_empty=&s=x",
        );
        let filters = resolver().resolve_meta_filters(&params);
        assert_eq!(
            filters,
            vec![
                MetadataFilter {
                    field_name: "color".into(),
                    values: vec!["red".into(), "blue".into()],
                },
                MetadataFilter {
                    field_name: "size".into(),
                    values: vec!["L".into()],
                },
            ]
        );
    }

    #[test]
    fn test_split_selection() {
        assert_eq!(split_selection("report:department"), Some(("report", "department")));
        assert_eq!(split_selection("department"), None);
        assert_eq!(split_selection("a:b:c"), None);
        assert_eq!(split_selection(":field"), None);
    }

    #[test]
    fn test_post_type_from_nested_block() {
        let resolver = resolver();
        let page = page_with_filter("report:department");
        assert_eq!(resolver.resolve_post_type_for_meta_filters(Some(&page)), "report");
        assert_eq!(
            resolver.resolve_post_type_for_meta_filters(Some(&page_with_filter("a:b:c"))),
            "document"
        );
        assert_eq!(resolver.resolve_post_type_for_meta_filters(None), "document");
    }

    #[test]
    fn test_key_variants_order() {
        assert_eq!(
            key_variants("department"),
            vec!["department", "department_select", "department_filter"]
        );
        assert_eq!(
            key_variants("department_select"),
            vec![
                "department_select",
                "department_select_select",
                "department_select_filter",
                "department"
            ]
        );
    }

    #[test]
    fn test_find_actual_meta_key() {
        let resolver = resolver();
        assert_eq!(resolver.find_actual_meta_key("document", "department"), "department_select");
        assert_eq!(resolver.find_actual_meta_key("document", "color"), "color");
        assert_eq!(resolver.find_actual_meta_key("document", "unknown"), "unknown");
    }

    #[test]
    fn test_apply_builds_and_of_fields() {
        let mut query = SearchQuery::main_search("");
        let ctx = RequestContext::new()
            .with_query_string("metadata_color=red,blue&metadata_department=HR");
        resolver().apply(&mut query, &ctx);

        assert_eq!(query.post_types, vec!["document"]);
        let meta_query = query.meta_query.unwrap();
        assert_eq!(meta_query.relation, Relation::And);
        let clauses = meta_query.clauses();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].compare, MetaCompare::In);
        assert_eq!(clauses[0].values, vec!["red", "blue"]);
        assert_eq!(clauses[1].key, "department_select");
        assert_eq!(clauses[1].compare, MetaCompare::Equals);
    }

    #[test]
    fn test_apply_keeps_explicit_post_type() {
        let mut query = SearchQuery::main_search("");
        query.set_post_type("page");
        let ctx = RequestContext::new().with_query_string("metadata_color=red");
        resolver().apply(&mut query, &ctx);
        assert_eq!(query.post_types, vec!["page"]);
    }

    #[test]
    fn test_apply_merges_existing_tree_under_and() {
        let mut existing = MetaQuery::default();
        existing.push(MetaClause::exists("featured"));
        let mut query = SearchQuery::main_search("");
        query.meta_query = Some(existing.clone());

        let ctx = RequestContext::new().with_query_string("metadata_color=red");
        resolver().apply(&mut query, &ctx);

        let merged = query.meta_query.unwrap();
        assert_eq!(merged.relation, Relation::And);
        assert_eq!(merged.entries[0].node, MetaQueryNode::Group(existing));
    }

    #[test]
    fn test_apply_skips_admin() {
        let mut query = SearchQuery::main_search("");
        let ctx = RequestContext::new().admin().with_query_string("metadata_color=red");
        resolver().apply(&mut query, &ctx);
        assert!(query.meta_query.is_none());
    }

    #[test]
    fn test_apply_from_query_vars() {
        let mut query = SearchQuery::main_search("");
        query.set_var("metadata_color", ParamValue::from("red"));
        resolver().apply(&mut query, &RequestContext::new());
        assert_eq!(query.meta_query.unwrap().clauses()[0].values, vec!["red"]);
    }

    #[test]
    fn test_possible_values_cached() {
        let store = store();
        let resolver = resolver_with(store.clone());
        assert_eq!(resolver.possible_values("document", "color"), vec!["blue", "red"]);

        store.insert_post(Post::published(7, "document", "G").with_meta("color", "amber"));
        assert_eq!(resolver.possible_values("document", "color"), vec!["blue", "red"]);
        assert!(resolver.possible_values("", "color").is_empty());
    }
}
