// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Taxonomy filter resolver.
//!
//! Turns `taxonomy_<name>=<ids>` request parameters into a taxonomy filter
//! tree on the main search query, and narrows the post type to the one the
//! filtered taxonomies belong to.

use std::sync::Arc;

use tracing::debug;

use super::tax_query::{FilterClause, TaxQuery};
use crate::config::AugmentConfig;
use crate::context::RequestContext;
use crate::metrics;
use crate::params::{sanitize_key, sanitize_text_field, ParamValue, RequestParams};
use crate::query::{Relation, SearchQuery};
use crate::storage::traits::Registry;

/// Request parameter selecting the post type explicitly.
pub const POST_TYPE_PARAM: &str = "post_type";

pub struct TaxonomyFilterResolver {
    config: Arc<AugmentConfig>,
    registry: Arc<dyn Registry>,
}

impl TaxonomyFilterResolver {
    pub fn new(config: Arc<AugmentConfig>, registry: Arc<dyn Registry>) -> Self {
        Self { config, registry }
    }

    /// Build the filter tree for every valid taxonomy parameter.
    pub fn resolve_filters(&self, params: &RequestParams) -> TaxQuery {
        let mut tax_query = TaxQuery::new(Relation::And);
        for (key, value) in params.iter() {
            let key = sanitize_key(key);
            let Some(taxonomy) = key.strip_prefix(self.config.taxonomy_param_prefix.as_str()) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if !is_valid_taxonomy_name(taxonomy) {
                metrics::record_filter_dropped("taxonomy", "invalid_name");
                continue;
            }
            if !self.registry.taxonomy_exists(taxonomy) {
                metrics::record_filter_dropped("taxonomy", "unknown_taxonomy");
                debug!(taxonomy, "Ignoring filter for unregistered taxonomy");
                continue;
            }

            let terms = parse_term_ids(value);
            if terms.is_empty() {
                metrics::record_filter_dropped("taxonomy", "no_terms");
                continue;
            }
            metrics::record_filter_applied("taxonomy");
            tax_query.push(FilterClause::term_ids(taxonomy, terms));
        }
        tax_query
    }

    /// Apply request taxonomy filters to the main front-end search query.
    pub fn apply(&self, query: &mut SearchQuery, ctx: &RequestContext) {
        if ctx.is_admin || !query.is_search || !query.is_main_query {
            return;
        }

        let params = match &ctx.params {
            Some(params) => params.clone(),
            None => self.params_from_query_vars(query),
        };

        let explicit_post_type = params.get(POST_TYPE_PARAM).filter(|v| !v.is_empty());
        if let Some(requested) = explicit_post_type {
            self.apply_explicit_post_type(query, requested);
        }

        let filters = self.resolve_filters(&params);
        if filters.is_empty() {
            return;
        }
        let merged = TaxQuery::merge_and(query.tax_query.take(), filters);

        if explicit_post_type.is_none()
            && query.post_type_is_default(&self.config.default_post_type)
        {
            if let Some(post_type) = self.post_type_for_filters(&merged) {
                debug!(%post_type, "Narrowed post type from taxonomy filters");
                query.set_post_type(post_type);
            }
        }
        debug!(clauses = merged.clauses().len(), "Applied taxonomy filters");
        query.tax_query = Some(merged);
    }

    /// Find the registered taxonomy of `post_type` that `name` refers to:
    /// exact, then case-insensitive, then substring.
    pub fn resolve_taxonomy_name(&self, post_type: &str, name: &str) -> Option<String> {
        let mut taxonomies = self.registry.object_taxonomies(post_type);
        if taxonomies.is_empty() {
            taxonomies = self
                .registry
                .post_types()
                .into_iter()
                .filter(|p| p.name.eq_ignore_ascii_case(post_type))
                .map(|p| self.registry.object_taxonomies(&p.name))
                .find(|found| !found.is_empty())?;
        }

        if taxonomies.iter().any(|t| t == name) {
            return Some(name.to_string());
        }
        let needle = name.to_lowercase();
        taxonomies
            .into_iter()
            .find(|t| t.eq_ignore_ascii_case(name) || t.to_lowercase().contains(&needle))
    }

    fn apply_explicit_post_type(&self, query: &mut SearchQuery, requested: &ParamValue) {
        let valid: Vec<String> = requested
            .as_list()
            .iter()
            .map(|p| sanitize_key(p))
            .filter(|p| self.registry.post_type(p).is_some_and(|info| info.public))
            .collect();
        if valid.is_empty() {
            debug!(?requested, "Ignoring unknown or private post type");
            return;
        }
        query.post_types = valid;
    }

    /// First object type other than the generic one, over the filtered taxonomies.
    fn post_type_for_filters(&self, tax_query: &TaxQuery) -> Option<String> {
        tax_query.clauses().into_iter().find_map(|clause| {
            self.registry.taxonomy(&clause.taxonomy).and_then(|info| {
                info.object_types
                    .into_iter()
                    .find(|t| *t != self.config.default_post_type)
            })
        })
    }

    /// Rebuild filter parameters from recorded query variables.
    fn params_from_query_vars(&self, query: &SearchQuery) -> RequestParams {
        let mut params = RequestParams::new();
        for taxonomy in self.registry.taxonomies() {
            let name = format!("{}{}", self.config.taxonomy_param_prefix, taxonomy.name);
            if let Some(value) = query.vars.get(&name) {
                params.insert(name, sanitize_value(value));
            }
        }
        if let Some(value) = query.vars.get(POST_TYPE_PARAM) {
            params.insert(POST_TYPE_PARAM, sanitize_value(value));
        }
        params
    }
}

fn sanitize_value(value: &ParamValue) -> ParamValue {
    match value {
        ParamValue::Scalar(s) => ParamValue::Scalar(sanitize_text_field(s)),
        ParamValue::List(items) => {
            ParamValue::List(items.iter().map(|v| sanitize_text_field(v)).collect())
        }
    }
}

fn is_valid_taxonomy_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Positive term IDs from a list or comma-separated value.
pub fn parse_term_ids(value: &ParamValue) -> Vec<i64> {
    value
        .as_list()
        .iter()
        .map(|v| leading_int(&sanitize_text_field(v)))
        .filter(|id| *id > 0)
        .collect()
}

/// Integer value of the leading digits of `s` (after optional whitespace and
/// sign); 0 when there are none. Saturates instead of overflowing.
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(digit - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tax_query::{TaxOperator, TaxQueryNode};
    use crate::storage::memory::InMemoryStore;
    use crate::storage::traits::TaxonomyInfo;

    fn registry() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.register_post_type("post", true);
        store.register_post_type("document", true);
        store.register_post_type("Report", true);
        store.register_post_type("internal_note", false);
        store.register_taxonomy(TaxonomyInfo::public("category", &["post", "document"]));
        store.register_taxonomy(TaxonomyInfo::public("document_type", &["document"]));
        store.register_taxonomy(TaxonomyInfo::public("Region", &["Report"]));
        Arc::new(store)
    }

    fn resolver() -> TaxonomyFilterResolver {
        TaxonomyFilterResolver::new(Arc::new(AugmentConfig::default()), registry())
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("12"), 12);
        assert_eq!(leading_int(" 7abc"), 7);
        assert_eq!(leading_int("abc"), 0);
        assert_eq!(leading_int("-4"), -4);
        assert_eq!(leading_int("+9"), 9);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_int("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_comma_separated_term_ids() {
        let filters = resolver().resolve_filters(&RequestParams::parse("taxonomy_category=5,7,12"));
        assert_eq!(
            filters.nodes,
            vec![TaxQueryNode::Clause(FilterClause::term_ids("category", vec![5, 7, 12]))]
        );
        let clause = filters.clauses()[0];
        assert_eq!(clause.operator, TaxOperator::In);
        assert!(clause.include_children);
    }

    #[test]
    fn test_invalid_ids_dropped() {
        let params = RequestParams::parse("taxonomy_category=5,abc,12,-3,0");
        let filters = resolver().resolve_filters(&params);
        assert_eq!(filters.clauses()[0].terms, vec![5, 12]);

        let filters = resolver().resolve_filters(&RequestParams::parse("taxonomy_category=abc"));
        assert!(filters.is_empty());
    }

    #[test]
    fn test_array_values() {
        let params = RequestParams::parse("taxonomy_category[]=3&taxonomy_category[]=4");
        let filters = resolver().resolve_filters(&params);
        assert_eq!(filters.clauses()[0].terms, vec![3, 4]);
    }

    #[test]
    fn test_unknown_and_malformed_taxonomies_ignored() {
        let filters = resolver().resolve_filters(&RequestParams::parse(
            "taxonomy_nope=1&taxonomy_=2&taxonomy_%21%21=3&taxonomy_document_type=4",
        ));
        let names: Vec<&str> = filters.clauses().iter().map(|c| c.taxonomy.as_str()).collect();
        assert_eq!(names, vec!["document_type"]);
    }

    #[test]
    fn test_apply_infers_post_type() {
        let mut query = SearchQuery::main_search("report");
        let ctx = RequestContext::new().with_query_string("s=report&taxonomy_category=3");
        resolver().apply(&mut query, &ctx);

        assert_eq!(query.post_types, vec!["document"]);
        assert_eq!(query.tax_query.unwrap().clauses()[0].terms, vec![3]);
    }

    #[test]
    fn test_explicit_post_type_wins() {
        let mut query = SearchQuery::main_search("report");
        let ctx =
            RequestContext::new().with_query_string("post_type=post&taxonomy_document_type=3");
        resolver().apply(&mut query, &ctx);
        assert_eq!(query.post_types, vec!["post"]);
    }

    #[test]
    fn test_private_post_type_rejected_without_inference() {
        let mut query = SearchQuery::main_search("report");
        let ctx = RequestContext::new()
            .with_query_string("post_type=internal_note&taxonomy_document_type=3");
        resolver().apply(&mut query, &ctx);
        assert!(query.post_types.is_empty());
        assert!(query.tax_query.is_some());
    }

    #[test]
    fn test_array_post_type_param() {
        let mut query = SearchQuery::main_search("x");
        let ctx = RequestContext::new()
            .with_query_string("post_type[]=document&post_type[]=post&post_type[]=bogus");
        resolver().apply(&mut query, &ctx);
        assert_eq!(query.post_types, vec!["document", "post"]);
    }

    #[test]
    fn test_merges_with_existing_tree() {
        let mut existing = TaxQuery::new(Relation::And);
        existing.push(FilterClause::term_ids("document_type", vec![9]));
        let mut query = SearchQuery::main_search("x");
        query.tax_query = Some(existing);

        let ctx = RequestContext::new().with_query_string("taxonomy_category=3");
        resolver().apply(&mut query, &ctx);

        let merged = query.tax_query.unwrap();
        assert_eq!(merged.relation, Relation::And);
        let names: Vec<&str> = merged.clauses().iter().map(|c| c.taxonomy.as_str()).collect();
        assert_eq!(names, vec!["document_type", "category"]);
    }

    #[test]
    fn test_reconstructs_params_from_query_vars() {
        let mut query = SearchQuery::main_search("x");
        query.set_var("taxonomy_category", ParamValue::from("4"));
        resolver().apply(&mut query, &RequestContext::new());
        assert_eq!(query.tax_query.unwrap().clauses()[0].terms, vec![4]);
        assert_eq!(query.post_types, vec!["document"]);
    }

    #[test]
    fn test_skips_admin_and_secondary_queries() {
        let ctx = RequestContext::new().admin().with_query_string("taxonomy_category=3");
        let mut query = SearchQuery::main_search("x");
        resolver().apply(&mut query, &ctx);
        assert!(query.tax_query.is_none());

        let ctx = RequestContext::new().with_query_string("taxonomy_category=3");
        let mut query = SearchQuery::main_search("x");
        query.is_main_query = false;
        resolver().apply(&mut query, &ctx);
        assert!(query.tax_query.is_none());
    }

    #[test]
    fn test_resolve_taxonomy_name() {
        let resolver = resolver();
        let name = |post_type: &str, field: &str| resolver.resolve_taxonomy_name(post_type, field);
        assert_eq!(name("document", "category").as_deref(), Some("category"));
        assert_eq!(name("document", "CATEGORY").as_deref(), Some("category"));
        assert_eq!(name("document", "type").as_deref(), Some("document_type"));
        assert_eq!(name("report", "region").as_deref(), Some("Region"));
        assert_eq!(resolver.resolve_taxonomy_name("document", "missing"), None);
        assert_eq!(resolver.resolve_taxonomy_name("nothing", "category"), None);
    }
}
