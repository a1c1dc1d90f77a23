// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder - AST for search clauses
//!
//! A type-safe representation of the search condition added to the host's
//! `WHERE` clause. The same tree is rendered to SQL by
//! [`SqlTranslator`](super::SqlTranslator) and evaluated directly by the
//! in-memory host.
//!
//! # Example
//!
//! ```rust
//! use search_augment::search::{PostColumn, Query, QueryBuilder};
//! use search_augment::Relation;
//!
//! // One term matched against title or a metadata field
//! let query = QueryBuilder::new()
//!     .post_contains(PostColumn::Title, "report")
//!     .meta_contains("department", "report")
//!     .build(Relation::Or)
//!     .unwrap();
//!
//! // Boolean combinations
//! let query = query.and(Query::post_eq(PostColumn::Password, ""));
//! ```

use serde::{Deserialize, Serialize};

use crate::query::Relation;

/// Search query AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Root query node
    pub root: QueryNode,
}

impl Query {
    /// Create a new query from a root node
    pub fn new(root: QueryNode) -> Self {
        Self { root }
    }

    /// Column contains text: `posts.col LIKE '%text%'`
    pub fn post_contains(column: PostColumn, text: impl Into<String>) -> Self {
        Self::new(QueryNode::Field(FieldQuery {
            target: FieldTarget::Post(column),
            operator: FieldOperator::Contains,
            value: text.into(),
        }))
    }

    /// Column equals value: `posts.col = 'value'`
    pub fn post_eq(column: PostColumn, value: impl Into<String>) -> Self {
        Self::new(QueryNode::Field(FieldQuery {
            target: FieldTarget::Post(column),
            operator: FieldOperator::Equals,
            value: value.into(),
        }))
    }

    /// Metadata field contains text
    pub fn meta_contains(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(QueryNode::Field(FieldQuery {
            target: FieldTarget::Meta { key: key.into() },
            operator: FieldOperator::Contains,
            value: text.into(),
        }))
    }

    /// Term name in taxonomy contains text
    pub fn taxonomy_contains(taxonomy: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(QueryNode::Field(FieldQuery {
            target: FieldTarget::Taxonomy {
                taxonomy: taxonomy.into(),
            },
            operator: FieldOperator::Contains,
            value: text.into(),
        }))
    }

    /// Combine with AND
    pub fn and(self, other: Query) -> Self {
        Self::new(QueryNode::And(vec![self.root, other.root]))
    }

    /// Combine with OR
    pub fn or(self, other: Query) -> Self {
        Self::new(QueryNode::Or(vec![self.root, other.root]))
    }

    /// Number of leaf clauses in the tree
    pub fn clause_count(&self) -> usize {
        self.root.clause_count()
    }
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    Field(FieldQuery),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
}

impl QueryNode {
    /// Group nodes under a relation. A single node is returned as-is.
    pub fn group(relation: Relation, mut nodes: Vec<QueryNode>) -> Option<QueryNode> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(match relation {
                Relation::And => QueryNode::And(nodes),
                Relation::Or => QueryNode::Or(nodes),
            }),
        }
    }

    pub fn clause_count(&self) -> usize {
        match self {
            QueryNode::Field(_) => 1,
            QueryNode::And(nodes) | QueryNode::Or(nodes) => {
                nodes.iter().map(QueryNode::clause_count).sum()
            }
        }
    }
}

/// Post table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostColumn {
    Title,
    Content,
    Excerpt,
    Password,
}

impl PostColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            PostColumn::Title => "post_title",
            PostColumn::Content => "post_content",
            PostColumn::Excerpt => "post_excerpt",
            PostColumn::Password => "post_password",
        }
    }
}

/// What a field clause matches against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldTarget {
    /// A column of the posts table
    Post(PostColumn),
    /// A metadata value under `key` (joined postmeta)
    Meta { key: String },
    /// A term name in `taxonomy` (joined term tables)
    Taxonomy { taxonomy: String },
}

/// Field query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub target: FieldTarget,
    /// Comparison operator
    pub operator: FieldOperator,
    /// Raw (unescaped) comparison value
    pub value: String,
}

/// Field comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOperator {
    /// Exact match
    Equals,
    /// Substring match: `LIKE '%value%'`
    Contains,
}

/// Builder for one OR/AND group of clauses
#[derive(Default)]
pub struct QueryBuilder {
    nodes: Vec<QueryNode>,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn post_contains(mut self, column: PostColumn, text: impl Into<String>) -> Self {
        self.nodes.push(Query::post_contains(column, text).root);
        self
    }

    pub fn meta_contains(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.nodes.push(Query::meta_contains(key, text).root);
        self
    }

    pub fn taxonomy_contains(
        mut self,
        taxonomy: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.nodes.push(Query::taxonomy_contains(taxonomy, text).root);
        self
    }

    /// Add an already-built node
    pub fn node(mut self, node: QueryNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build the group, or `None` when nothing was added
    pub fn build(self, relation: Relation) -> Option<Query> {
        QueryNode::group(relation, self.nodes).map(Query::new)
    }
}
