// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The search augmenter.
//!
//! Wires every component to the host and exposes one method per host
//! lifecycle stage. The host calls them in its fixed order for each request:
//!
//! ```text
//! pre_get_posts   taxonomy filter → metadata filter → sort
//! posts_search    search fragment (records clauses in the context)
//! posts_join      joins for the recorded clauses, once
//! posts_distinct  DISTINCT when joins were added
//! posts_orderby   NULL-last metadata ordering
//! ```
//!
//! None of these fail: problems are logged and the host's own fragment is
//! returned unchanged.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::cache::{TransientStore, TtlCache};
use crate::config::AugmentConfig;
use crate::context::RequestContext;
use crate::error::AugmentError;
use crate::filter::{MetadataFilterResolver, TaxonomyFilterResolver};
use crate::hooks::{NoopHooks, SearchHooks};
use crate::metrics;
use crate::params::RequestParams;
use crate::query::SearchQuery;
use crate::search::{Discoverer, JoinInjector, MetaChange, SearchClauseBuilder};
use crate::sort::{apply_directive, rewrite_orderby, SortInput, SortResolver};
use crate::storage::memory::InMemoryStore;
use crate::storage::traits::{MetaStore, OptionStore, Registry};

/// Host collaborators.
#[derive(Clone)]
pub struct Host {
    pub meta: Arc<dyn MetaStore>,
    pub registry: Arc<dyn Registry>,
    pub options: Arc<dyn OptionStore>,
    pub cache: Arc<dyn TransientStore>,
    pub hooks: Arc<dyn SearchHooks>,
}

impl Host {
    /// Everything backed by one in-memory store, with a fresh TTL cache.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            meta: store.clone(),
            registry: store.clone(),
            options: store,
            cache: Arc::new(TtlCache::new()),
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn TransientStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn SearchHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}

/// The SQL fragments produced for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentedSql {
    pub search: String,
    pub join: String,
    pub distinct: String,
    pub orderby: String,
}

pub struct SearchAugmenter {
    config: Arc<AugmentConfig>,
    discoverer: Arc<Discoverer>,
    clauses: SearchClauseBuilder,
    joins: JoinInjector,
    taxonomy: TaxonomyFilterResolver,
    metadata: MetadataFilterResolver,
    sort: SortResolver,
}

impl SearchAugmenter {
    pub fn new(config: AugmentConfig, host: Host) -> Result<Self, AugmentError> {
        config.validate()?;
        let config = Arc::new(config);
        let discoverer = Arc::new(Discoverer::new(
            config.clone(),
            host.meta.clone(),
            host.registry.clone(),
            host.cache.clone(),
            host.hooks.clone(),
        ));
        Ok(Self {
            clauses: SearchClauseBuilder::new(
                config.clone(),
                discoverer.clone(),
                host.hooks.clone(),
            ),
            joins: JoinInjector::new(config.clone()),
            taxonomy: TaxonomyFilterResolver::new(config.clone(), host.registry.clone()),
            metadata: MetadataFilterResolver::new(config.clone(), host.meta, host.cache),
            sort: SortResolver::new(host.options, config.sort_config_option.clone()),
            discoverer,
            config,
        })
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    pub fn discoverer(&self) -> &Discoverer {
        &self.discoverer
    }

    pub fn taxonomy_filter(&self) -> &TaxonomyFilterResolver {
        &self.taxonomy
    }

    pub fn metadata_filter(&self) -> &MetadataFilterResolver {
        &self.metadata
    }

    pub fn sort_resolver(&self) -> &SortResolver {
        &self.sort
    }

    /// Filters and sort, before the host builds its SQL.
    #[instrument(skip_all)]
    pub fn pre_get_posts(&self, query: &mut SearchQuery, ctx: &mut RequestContext) {
        self.taxonomy.apply(query, ctx);
        self.metadata.apply(query, ctx);
        self.apply_sort(query, ctx);
    }

    #[instrument(skip_all)]
    pub fn posts_search(
        &self,
        existing: &str,
        query: &SearchQuery,
        ctx: &mut RequestContext,
    ) -> String {
        self.clauses.build_search_sql(existing, query, ctx)
    }

    #[instrument(skip_all)]
    pub fn posts_join(&self, existing: &str, ctx: &mut RequestContext) -> String {
        self.joins.inject_joins(existing, ctx)
    }

    pub fn posts_distinct(&self, existing: &str, ctx: &RequestContext) -> String {
        self.joins.force_distinct(existing, ctx)
    }

    #[instrument(skip_all)]
    pub fn posts_orderby(
        &self,
        existing: &str,
        query: &SearchQuery,
        ctx: &RequestContext,
    ) -> String {
        if !is_front_end_main_search(query, ctx) {
            return existing.to_string();
        }
        rewrite_orderby(existing, ctx.sort(), &self.config.posts_table())
    }

    /// Metadata was added, updated or deleted somewhere.
    pub fn on_post_meta_changed(&self, change: MetaChange) {
        self.discoverer.on_meta_changed(change);
    }

    /// Run every stage against empty host fragments.
    pub fn augment(&self, query: &mut SearchQuery, ctx: &mut RequestContext) -> AugmentedSql {
        self.pre_get_posts(query, ctx);
        let search = self.posts_search("", query, ctx);
        let join = self.posts_join("", ctx);
        let distinct = self.posts_distinct("", ctx);
        let orderby = self.posts_orderby("", query, ctx);
        AugmentedSql {
            search,
            join,
            distinct,
            orderby,
        }
    }

    fn apply_sort(&self, query: &mut SearchQuery, ctx: &mut RequestContext) {
        if !is_front_end_main_search(query, ctx) {
            return;
        }
        let params: RequestParams = match &ctx.params {
            Some(params) => params.clone(),
            None => query.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        let input = SortInput {
            params: &params,
            has_keyword: query.has_keyword(),
        };
        let Some((rule, directive)) = self.sort.resolve(&input) else {
            return;
        };
        metrics::record_sort_rule(rule);
        debug!(rule, ?directive, "Sort decided");
        if let Some(directive) = directive {
            apply_directive(query, &directive);
            ctx.set_sort(directive);
        }
    }
}

fn is_front_end_main_search(query: &SearchQuery, ctx: &RequestContext) -> bool {
    !ctx.is_admin && query.is_main_query && query.is_search
}
