// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The host query object.
//!
//! A typed stand-in for the CMS query the lifecycle stages mutate: the search
//! phrase, post type selection, ordering, and the taxonomy/metadata filter
//! trees. `vars` holds the host's recorded query variables, which are the only
//! parameter source when the raw request is unavailable.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::meta_query::MetaQuery;
use crate::filter::tax_query::TaxQuery;
use crate::params::ParamValue;

/// Boolean relation between sibling clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    And,
    Or,
}

impl Relation {
    pub fn as_sql(self) -> &'static str {
        match self {
            Relation::And => "AND",
            Relation::Or => "OR",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Parse a lowercase `asc`/`desc` value. Anything else is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Order::Asc),
            "desc" => Some(Order::Desc),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// The query's `orderby` variable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderBy {
    /// Host default (relevance for keyword searches)
    #[default]
    Default,
    Title,
    /// Order by the value of `meta_key`
    MetaValue,
    /// Order by a named metadata clause with its own direction
    Clause { name: String, order: Order },
}

/// Host query object handed to each lifecycle stage.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Raw search phrase (`s`)
    pub search: Option<String>,
    pub is_search: bool,
    pub is_main_query: bool,
    /// Selected post types; empty means unset
    pub post_types: Vec<String>,
    pub orderby: OrderBy,
    pub order: Option<Order>,
    pub meta_key: Option<String>,
    pub tax_query: Option<TaxQuery>,
    pub meta_query: Option<MetaQuery>,
    /// Query variables the host copied from the request
    pub vars: BTreeMap<String, ParamValue>,
}

impl SearchQuery {
    /// Main front-end search query for the given phrase.
    pub fn main_search(phrase: impl Into<String>) -> Self {
        Self {
            search: Some(phrase.into()),
            is_search: true,
            is_main_query: true,
            ..Default::default()
        }
    }

    /// The search phrase, if it has any non-whitespace content.
    pub fn keyword(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn has_keyword(&self) -> bool {
        self.keyword().is_some()
    }

    /// True when no post type is selected or only the host's generic one.
    pub fn post_type_is_default(&self, default_post_type: &str) -> bool {
        match self.post_types.as_slice() {
            [] => true,
            [only] => only == default_post_type,
            _ => false,
        }
    }

    pub fn set_post_type(&mut self, post_type: impl Into<String>) {
        self.post_types = vec![post_type.into()];
    }

    /// Record a query variable, as the host does for registered URL parameters.
    pub fn set_var(&mut self, key: impl Into<String>, value: ParamValue) {
        self.vars.insert(key.into(), value);
    }
}
