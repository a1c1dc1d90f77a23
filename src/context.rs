// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-request state.
//!
//! One `RequestContext` is created for each request and threaded through every
//! lifecycle stage. It carries who is asking, the raw parameters and page
//! content when the host has them, and what earlier stages decided.

use crate::blocks::ContentObject;
use crate::params::RequestParams;
use crate::search::Query;
use crate::sort::SortDirective;

/// Fields the search fragment actually referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFields {
    pub meta_keys: Vec<String>,
    pub taxonomies: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub is_admin: bool,
    pub is_ajax: bool,
    pub is_authenticated: bool,
    /// Raw request parameters; `None` outside a browser request
    pub params: Option<RequestParams>,
    /// The page being rendered, when known
    pub content: Option<ContentObject>,
    search_clause: Option<Query>,
    search_fields: SearchFields,
    clauses_built: bool,
    joins_injected: bool,
    sort: Option<SortDirective>,
}

impl RequestContext {
    /// Anonymous front-end request.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: RequestParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_query_string(self, query: &str) -> Self {
        self.with_params(RequestParams::parse(query))
    }

    pub fn with_content(mut self, content: ContentObject) -> Self {
        self.content = Some(content);
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.is_authenticated = true;
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn ajax(mut self) -> Self {
        self.is_ajax = true;
        self
    }

    /// Front-end page load (not admin, not ajax).
    pub fn is_frontend(&self) -> bool {
        !self.is_admin && !self.is_ajax
    }

    /// The search condition built for this request, if any.
    pub fn search_clause(&self) -> Option<&Query> {
        self.search_clause.as_ref()
    }

    pub fn search_fields(&self) -> &SearchFields {
        &self.search_fields
    }

    pub fn clauses_built(&self) -> bool {
        self.clauses_built
    }

    pub fn joins_injected(&self) -> bool {
        self.joins_injected
    }

    pub fn sort(&self) -> Option<&SortDirective> {
        self.sort.as_ref()
    }

    /// A new search fragment needs its own joins, even after an earlier one
    /// in the same request already had them.
    pub(crate) fn record_search(&mut self, clause: Query, fields: SearchFields) {
        self.search_clause = Some(clause);
        self.search_fields = fields;
        self.clauses_built = true;
        self.joins_injected = false;
    }

    pub(crate) fn mark_joins_injected(&mut self) {
        self.joins_injected = true;
    }

    pub(crate) fn set_sort(&mut self, directive: SortDirective) {
        self.sort = Some(directive);
    }
}
