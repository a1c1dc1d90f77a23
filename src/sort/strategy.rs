// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sort rule chain.
//!
//! Rules run in priority order; the first one that handles the request decides
//! the sort, even when the decision is "leave the host's order alone".
//!
//! ```text
//! 1. sort=relevance                          → handled, host order
//! 2. sort=title_asc|title_desc               → title
//! 3. meta_sort=asc|desc & meta_field         → metadata
//! 4. no URL sort, no keyword, stored config  → metadata
//! 5. no URL sort, no keyword                 → title ASC
//! 6. sort_meta=asc|desc & sort_meta_field    → metadata (legacy)
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::SortDirective;
use crate::params::{sanitize_text_field, RequestParams};
use crate::query::Order;
use crate::storage::traits::OptionStore;

pub const SORT_PARAM: &str = "sort";
pub const META_SORT_PARAM: &str = "meta_sort";
pub const META_FIELD_PARAM: &str = "meta_field";
pub const LEGACY_SORT_PARAM: &str = "sort_meta";
pub const LEGACY_FIELD_PARAM: &str = "sort_meta_field";

/// Page-level default sort stored by the sort block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortBlockConfig {
    #[serde(default)]
    pub selected_meta_field: String,
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
}

fn default_sort_order() -> String {
    "asc".into()
}

/// What a rule sees of the request.
#[derive(Debug, Clone, Copy)]
pub struct SortInput<'a> {
    pub params: &'a RequestParams,
    pub has_keyword: bool,
}

impl SortInput<'_> {
    fn param(&self, key: &str) -> Option<String> {
        self.params
            .get_str(key)
            .map(sanitize_text_field)
            .filter(|v| !v.is_empty())
    }

    fn has_url_sort(&self) -> bool {
        [SORT_PARAM, META_SORT_PARAM, LEGACY_SORT_PARAM]
            .iter()
            .any(|key| self.param(key).is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// This rule decides; `None` keeps the host's order
    Handled(Option<SortDirective>),
    Pass,
}

pub trait SortRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome;
}

struct RelevanceRule;

impl SortRule for RelevanceRule {
    fn name(&self) -> &'static str {
        "relevance"
    }

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome {
        match input.param(SORT_PARAM).as_deref() {
            Some("relevance") => SortOutcome::Handled(None),
            _ => SortOutcome::Pass,
        }
    }
}

struct TitleParamRule;

impl SortRule for TitleParamRule {
    fn name(&self) -> &'static str {
        "title_param"
    }

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome {
        match input.param(SORT_PARAM).as_deref() {
            Some("title_asc") => SortOutcome::Handled(Some(SortDirective::title(Order::Asc))),
            Some("title_desc") => SortOutcome::Handled(Some(SortDirective::title(Order::Desc))),
            _ => SortOutcome::Pass,
        }
    }
}

/// `<direction param>=asc|desc` together with a non-empty `<field param>`.
struct MetaParamRule {
    name: &'static str,
    direction_param: &'static str,
    field_param: &'static str,
}

impl SortRule for MetaParamRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome {
        let direction = input.param(self.direction_param).and_then(|d| Order::parse(&d));
        match (direction, input.param(self.field_param)) {
            (Some(direction), Some(field)) => {
                SortOutcome::Handled(Some(SortDirective::meta(&field, direction)))
            }
            _ => SortOutcome::Pass,
        }
    }
}

struct BlockConfigRule {
    options: Arc<dyn OptionStore>,
    option_name: String,
}

impl BlockConfigRule {
    fn load(&self) -> Option<SortBlockConfig> {
        let value = match self.options.get_option(&self.option_name) {
            Ok(value) => value?,
            Err(e) => {
                warn!(option = %self.option_name, error = %e, "Sort configuration unavailable");
                return None;
            }
        };
        match serde_json::from_value::<SortBlockConfig>(value) {
            Ok(config) if !config.selected_meta_field.is_empty() => Some(config),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed sort configuration");
                None
            }
        }
    }
}

impl SortRule for BlockConfigRule {
    fn name(&self) -> &'static str {
        "block_config"
    }

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome {
        if input.has_url_sort() || input.has_keyword {
            return SortOutcome::Pass;
        }
        let Some(config) = self.load() else {
            return SortOutcome::Pass;
        };
        // A stored direction other than asc/desc still claims the request
        let directive = Order::parse(&config.sort_order)
            .map(|order| SortDirective::meta(&config.selected_meta_field, order));
        SortOutcome::Handled(directive)
    }
}

struct TitleFallbackRule;

impl SortRule for TitleFallbackRule {
    fn name(&self) -> &'static str {
        "title_default"
    }

    fn evaluate(&self, input: &SortInput<'_>) -> SortOutcome {
        if input.has_url_sort() || input.has_keyword {
            SortOutcome::Pass
        } else {
            SortOutcome::Handled(Some(SortDirective::title(Order::Asc)))
        }
    }
}

/// Runs the rule chain.
pub struct SortResolver {
    rules: Vec<Box<dyn SortRule>>,
}

impl SortResolver {
    /// The standard chain, reading the page default from `option_name`.
    pub fn new(options: Arc<dyn OptionStore>, option_name: impl Into<String>) -> Self {
        Self::with_rules(vec![
            Box::new(RelevanceRule),
            Box::new(TitleParamRule),
            Box::new(MetaParamRule {
                name: "meta_param",
                direction_param: META_SORT_PARAM,
                field_param: META_FIELD_PARAM,
            }),
            Box::new(BlockConfigRule {
                options,
                option_name: option_name.into(),
            }),
            Box::new(TitleFallbackRule),
            Box::new(MetaParamRule {
                name: "legacy_meta_param",
                direction_param: LEGACY_SORT_PARAM,
                field_param: LEGACY_FIELD_PARAM,
            }),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn SortRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// The first handling rule's name and decision, or `None` when no rule
    /// applies.
    pub fn resolve(&self, input: &SortInput<'_>) -> Option<(&'static str, Option<SortDirective>)> {
        self.rules.iter().find_map(|rule| match rule.evaluate(input) {
            SortOutcome::Handled(directive) => Some((rule.name(), directive)),
            SortOutcome::Pass => None,
        })
    }
}
