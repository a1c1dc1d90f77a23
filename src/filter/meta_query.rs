// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metadata filter tree.
//!
//! Mirrors the host's `meta_query`: a relation over clauses and nested groups,
//! where each entry may carry a name so `orderby` can refer to it.

use serde::{Deserialize, Serialize};

use crate::query::Relation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaCompare {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "EXISTS")]
    Exists,
    #[serde(rename = "NOT EXISTS")]
    NotExists,
}

/// Cast applied to the stored value when comparing or ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaType {
    #[default]
    Char,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClause {
    pub key: String,
    pub compare: MetaCompare,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<MetaType>,
}

impl MetaClause {
    /// `=` for one value, `IN` for several.
    pub fn matching(key: impl Into<String>, values: Vec<String>) -> Self {
        let compare = if values.len() == 1 {
            MetaCompare::Equals
        } else {
            MetaCompare::In
        };
        Self {
            key: key.into(),
            compare,
            values,
            value_type: None,
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            compare: MetaCompare::Exists,
            values: Vec::new(),
            value_type: None,
        }
    }

    pub fn not_exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            compare: MetaCompare::NotExists,
            values: Vec::new(),
            value_type: None,
        }
    }

    pub fn typed(mut self, value_type: MetaType) -> Self {
        self.value_type = Some(value_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaQueryNode {
    Clause(MetaClause),
    Group(MetaQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaQueryEntry {
    /// Named entries can be referenced by `orderby`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub node: MetaQueryNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaQuery {
    pub relation: Relation,
    pub entries: Vec<MetaQueryEntry>,
}

impl Default for MetaQuery {
    fn default() -> Self {
        Self::new(Relation::And)
    }
}

impl MetaQuery {
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append an unnamed clause.
    pub fn push(&mut self, clause: MetaClause) {
        self.entries.push(MetaQueryEntry {
            name: None,
            node: MetaQueryNode::Clause(clause),
        });
    }

    /// Insert or replace a named entry.
    pub fn push_named(&mut self, name: impl Into<String>, node: MetaQueryNode) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name.as_deref() == Some(name.as_str())) {
            Some(entry) => entry.node = node,
            None => self.entries.push(MetaQueryEntry { name: Some(name), node }),
        }
    }

    pub fn named(&self, name: &str) -> Option<&MetaQueryNode> {
        self.entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .map(|e| &e.node)
    }

    /// Give every unnamed entry a `clause_<i>` name, `i` counting unnamed
    /// entries in order.
    pub fn name_positional_entries(&mut self) {
        let mut index = 0;
        for entry in &mut self.entries {
            if entry.name.is_none() {
                entry.name = Some(format!("clause_{index}"));
                index += 1;
            }
        }
    }

    /// Combine two trees under `AND`, keeping each as its own group.
    pub fn merge_and(existing: Option<MetaQuery>, additions: MetaQuery) -> MetaQuery {
        let Some(existing) = existing.filter(|q| !q.is_empty()) else {
            return additions;
        };
        let mut merged = MetaQuery::new(Relation::And);
        for group in [existing, additions] {
            merged.entries.push(MetaQueryEntry {
                name: None,
                node: MetaQueryNode::Group(group),
            });
        }
        merged
    }

    /// All clauses, depth-first in order.
    pub fn clauses(&self) -> Vec<&MetaClause> {
        let mut out = Vec::new();
        let mut stack: Vec<&MetaQueryNode> = self.entries.iter().rev().map(|e| &e.node).collect();
        while let Some(node) = stack.pop() {
            match node {
                MetaQueryNode::Clause(clause) => out.push(clause),
                MetaQueryNode::Group(group) => {
                    stack.extend(group.entries.iter().rev().map(|e| &e.node))
                }
            }
        }
        out
    }
}
