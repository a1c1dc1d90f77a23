// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory host.
//!
//! Holds posts, terms, registries and options in process, implements every
//! host trait, and can run an augmented [`SearchQuery`] the way the host's
//! SQL would: search condition, taxonomy and metadata trees, post types and
//! ordering.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::traits::{
    MetaKeyScan, MetaStore, OptionStore, PostTypeInfo, Registry, StoreError, TaxonomyInfo,
};
use crate::context::RequestContext;
use crate::filter::meta_query::{MetaClause, MetaCompare, MetaQuery, MetaQueryNode, MetaType};
use crate::filter::tax_query::{FilterClause, TaxQuery, TaxQueryNode};
use crate::query::{Order, OrderBy, Relation, SearchQuery};
use crate::search::{tokenize, FieldOperator, FieldQuery, FieldTarget, PostColumn, QueryNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Publish,
    Draft,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub post_type: String,
    pub status: PostStatus,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub password: String,
    /// Metadata in insertion order; keys may repeat
    pub meta: Vec<(String, String)>,
    pub term_ids: Vec<i64>,
}

impl Post {
    pub fn published(id: u64, post_type: &str, title: &str) -> Self {
        Self {
            id,
            post_type: post_type.to_string(),
            status: PostStatus::Publish,
            title: title.to_string(),
            content: String::new(),
            excerpt: String::new(),
            password: String::new(),
            meta: Vec::new(),
            term_ids: Vec::new(),
        }
    }

    pub fn draft(id: u64, post_type: &str, title: &str) -> Self {
        Self {
            status: PostStatus::Draft,
            ..Self::published(id, post_type, title)
        }
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn with_excerpt(mut self, excerpt: &str) -> Self {
        self.excerpt = excerpt.to_string();
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.meta.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_term(mut self, term_id: i64) -> Self {
        self.term_ids.push(term_id);
        self
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.iter().find(|(k, _)| same_key(k, key)).map(|(_, v)| v.as_str())
    }

    fn column(&self, column: PostColumn) -> &str {
        match column {
            PostColumn::Title => &self.title,
            PostColumn::Content => &self.content,
            PostColumn::Excerpt => &self.excerpt,
            PostColumn::Password => &self.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    pub parent: Option<i64>,
}

impl Term {
    pub fn new(id: i64, taxonomy: &str, name: &str) -> Self {
        Self {
            id,
            taxonomy: taxonomy.to_string(),
            name: name.to_string(),
            parent: None,
        }
    }

    pub fn child_of(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }
}

pub struct InMemoryStore {
    posts: DashMap<u64, Post>,
    terms: DashMap<i64, Term>,
    taxonomies: RwLock<Vec<TaxonomyInfo>>,
    post_types: RwLock<Vec<PostTypeInfo>>,
    options: DashMap<String, Value>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
            terms: DashMap::new(),
            taxonomies: RwLock::new(Vec::new()),
            post_types: RwLock::new(Vec::new()),
            options: DashMap::new(),
        }
    }

    /// Number of stored posts
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn remove_post(&self, id: u64) -> Option<Post> {
        self.posts.remove(&id).map(|(_, post)| post)
    }

    pub fn get_post(&self, id: u64) -> Option<Post> {
        self.posts.get(&id).map(|r| r.value().clone())
    }

    pub fn insert_term(&self, term: Term) {
        self.terms.insert(term.id, term);
    }

    /// Register or replace a post type.
    pub fn register_post_type(&self, name: &str, public: bool) {
        let mut post_types = self.post_types.write();
        post_types.retain(|p| p.name != name);
        post_types.push(PostTypeInfo {
            name: name.to_string(),
            public,
        });
    }

    /// Register or replace a taxonomy.
    pub fn register_taxonomy(&self, taxonomy: TaxonomyInfo) {
        let mut taxonomies = self.taxonomies.write();
        taxonomies.retain(|t| t.name != taxonomy.name);
        taxonomies.push(taxonomy);
    }

    pub fn set_option(&self, name: &str, value: Value) {
        self.options.insert(name.to_string(), value);
    }

    /// IDs of the posts the query returns, in result order.
    pub fn execute(&self, query: &SearchQuery, ctx: &RequestContext) -> Vec<u64> {
        let post_types = self.effective_post_types(query);
        let mut matched: Vec<Post> = self
            .posts
            .iter()
            .map(|r| r.value().clone())
            .filter(|post| post.status == PostStatus::Publish)
            .filter(|post| post_types.contains(&post.post_type))
            .filter(|post| self.matches_search(post, query, ctx))
            .filter(|post| {
                query.tax_query.as_ref().map_or(true, |q| self.matches_tax_query(post, q))
            })
            .filter(|post| query.meta_query.as_ref().map_or(true, |q| matches_meta_query(post, q)))
            .collect();

        let sort_key = sort_meta_key(query);
        matched.sort_by(|a, b| match (&query.orderby, sort_key.as_ref()) {
            (OrderBy::Title, _) => {
                let by_title = a.title.to_lowercase().cmp(&b.title.to_lowercase());
                apply_order(by_title, query.order.unwrap_or(Order::Desc)).then(a.id.cmp(&b.id))
            }
            (OrderBy::MetaValue | OrderBy::Clause { .. }, Some((key, is_date, order))) => {
                compare_meta(a, b, key, *is_date, *order)
            }
            _ => b.id.cmp(&a.id),
        });
        matched.into_iter().map(|p| p.id).collect()
    }

    /// Unset post types mean every public type.
    fn effective_post_types(&self, query: &SearchQuery) -> HashSet<String> {
        if query.post_types.is_empty() {
            self.post_types
                .read()
                .iter()
                .filter(|p| p.public)
                .map(|p| p.name.clone())
                .collect()
        } else {
            query.post_types.iter().cloned().collect()
        }
    }

    fn matches_search(&self, post: &Post, query: &SearchQuery, ctx: &RequestContext) -> bool {
        if let Some(clause) = ctx.search_clause() {
            return self.eval_node(&clause.root, post);
        }
        // Host default: every term somewhere in title, content or excerpt
        match query.keyword().filter(|_| query.is_search) {
            Some(phrase) => tokenize(phrase).iter().all(|term| {
                [PostColumn::Title, PostColumn::Content, PostColumn::Excerpt]
                    .iter()
                    .any(|c| contains_ci(post.column(*c), term))
            }),
            None => true,
        }
    }

    fn eval_node(&self, node: &QueryNode, post: &Post) -> bool {
        match node {
            QueryNode::Field(field) => self.eval_field(field, post),
            QueryNode::And(nodes) => nodes.iter().all(|n| self.eval_node(n, post)),
            QueryNode::Or(nodes) => nodes.iter().any(|n| self.eval_node(n, post)),
        }
    }

    fn eval_field(&self, field: &FieldQuery, post: &Post) -> bool {
        let compare = |value: &str| match field.operator {
            FieldOperator::Equals => value == field.value,
            FieldOperator::Contains => contains_ci(value, &field.value),
        };
        match &field.target {
            FieldTarget::Post(column) => compare(post.column(*column)),
            FieldTarget::Meta { key } => {
                post.meta.iter().any(|(k, v)| same_key(k, key) && compare(v))
            }
            FieldTarget::Taxonomy { taxonomy } => post.term_ids.iter().any(|id| {
                self.terms
                    .get(id)
                    .is_some_and(|term| term.taxonomy == *taxonomy && compare(&term.name))
            }),
        }
    }

    fn matches_tax_query(&self, post: &Post, query: &TaxQuery) -> bool {
        let mut results = query.nodes.iter().map(|node| match node {
            TaxQueryNode::Clause(clause) => self.matches_tax_clause(post, clause),
            TaxQueryNode::Group(group) => self.matches_tax_query(post, group),
        });
        match query.relation {
            Relation::And => results.all(|r| r),
            Relation::Or => query.nodes.is_empty() || results.any(|r| r),
        }
    }

    fn matches_tax_clause(&self, post: &Post, clause: &FilterClause) -> bool {
        let in_taxonomy: HashSet<i64> = post
            .term_ids
            .iter()
            .copied()
            .filter(|id| self.terms.get(id).is_some_and(|t| t.taxonomy == clause.taxonomy))
            .collect();
        clause.terms.iter().any(|&root| {
            in_taxonomy.contains(&root)
                || (clause.include_children
                    && self.descendants(root).iter().any(|id| in_taxonomy.contains(id)))
        })
    }

    fn descendants(&self, root: i64) -> Vec<i64> {
        let mut found = Vec::new();
        let mut frontier = vec![root];
        while let Some(parent) = frontier.pop() {
            for term in self.terms.iter() {
                if term.parent == Some(parent) && !found.contains(&term.id) {
                    found.push(term.id);
                    frontier.push(term.id);
                }
            }
        }
        found
    }

    fn published(&self) -> impl Iterator<Item = Post> + '_ {
        self.posts
            .iter()
            .filter(|r| r.status == PostStatus::Publish)
            .map(|r| r.value().clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaStore for InMemoryStore {
    fn distinct_meta_keys(&self, scan: &MetaKeyScan) -> Result<Vec<String>, StoreError> {
        let keys: BTreeSet<String> = self
            .published()
            .flat_map(|post| post.meta)
            .filter(|(k, v)| !v.is_empty() && scan.accepts(k))
            .map(|(k, _)| k)
            .collect();
        Ok(keys.into_iter().take(scan.limit).collect())
    }

    fn distinct_meta_values(&self, post_type: &str, key: &str) -> Result<Vec<String>, StoreError> {
        let values: BTreeSet<String> = self
            .published()
            .filter(|post| post.post_type == post_type)
            .flat_map(|post| post.meta)
            .filter(|(k, v)| same_key(k, key) && !v.is_empty())
            .map(|(_, v)| v)
            .collect();
        Ok(values.into_iter().collect())
    }

    fn meta_key_exists(&self, post_type: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self.posts.iter().any(|post| {
            post.post_type == post_type && post.meta.iter().any(|(k, _)| same_key(k, key))
        }))
    }
}

impl Registry for InMemoryStore {
    fn taxonomies(&self) -> Vec<TaxonomyInfo> {
        self.taxonomies.read().clone()
    }

    fn post_types(&self) -> Vec<PostTypeInfo> {
        self.post_types.read().clone()
    }
}

impl OptionStore for InMemoryStore {
    fn get_option(&self, name: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.options.get(name).map(|r| r.value().clone()))
    }
}

/// Metadata keys compare like the host's default collation: ignoring case.
fn same_key(stored: &str, key: &str) -> bool {
    stored.eq_ignore_ascii_case(key)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn apply_order(ordering: Ordering, order: Order) -> Ordering {
    match order {
        Order::Asc => ordering,
        Order::Desc => ordering.reverse(),
    }
}

fn matches_meta_query(post: &Post, query: &MetaQuery) -> bool {
    let mut results = query.entries.iter().map(|entry| match &entry.node {
        MetaQueryNode::Clause(clause) => matches_meta_clause(post, clause),
        MetaQueryNode::Group(group) => matches_meta_query(post, group),
    });
    match query.relation {
        Relation::And => results.all(|r| r),
        Relation::Or => query.entries.is_empty() || results.any(|r| r),
    }
}

fn matches_meta_clause(post: &Post, clause: &MetaClause) -> bool {
    let mut values = post.meta.iter().filter(|(k, _)| same_key(k, &clause.key)).map(|(_, v)| v);
    match clause.compare {
        MetaCompare::Equals => values.any(|v| clause.values.first() == Some(v)),
        MetaCompare::In => values.any(|v| clause.values.contains(v)),
        MetaCompare::Exists => values.next().is_some(),
        MetaCompare::NotExists => values.next().is_none(),
    }
}

/// Key, date-likeness and direction of a metadata sort, if the query has one.
fn sort_meta_key(query: &SearchQuery) -> Option<(String, bool, Order)> {
    match &query.orderby {
        OrderBy::MetaValue => {
            let key = query.meta_key.clone()?;
            Some((key, false, query.order.unwrap_or(Order::Desc)))
        }
        OrderBy::Clause { name, order } => {
            let node = query.meta_query.as_ref()?.named(name)?;
            let clause = match node {
                MetaQueryNode::Clause(clause) => clause.clone(),
                MetaQueryNode::Group(group) => (*group.clauses().first()?).clone(),
            };
            let is_date = clause.value_type == Some(MetaType::Date);
            Some((clause.key, is_date, *order))
        }
        _ => None,
    }
}

/// Missing values last in both directions, then value, then ID ascending.
fn compare_meta(a: &Post, b: &Post, key: &str, is_date: bool, order: Order) -> Ordering {
    let (va, vb) = (a.meta_value(key), b.meta_value(key));
    let by_value = match (va, vb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(x), Some(y)) if is_date => apply_order(parse_date(x).cmp(&parse_date(y)), order),
        (Some(x), Some(y)) => apply_order(x.to_lowercase().cmp(&y.to_lowercase()), order),
    };
    by_value.then(a.id.cmp(&b.id))
}

/// Date portion of a stored value, as MySQL's `CAST(... AS DATE)` reads it.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}
