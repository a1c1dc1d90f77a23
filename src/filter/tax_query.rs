// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Taxonomy filter tree.
//!
//! Mirrors the host's `tax_query` shape: a relation over clauses and nested
//! groups. Serializes to the host's array layout.

use serde::{Deserialize, Serialize};

use crate::query::Relation;

/// Which term column the `terms` refer to. Filters only ever select by ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermField {
    #[default]
    TermId,
}

/// Content must carry at least one of the terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaxOperator {
    #[default]
    #[serde(rename = "IN")]
    In,
}

/// One taxonomy condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub taxonomy: String,
    pub field: TermField,
    pub terms: Vec<i64>,
    pub operator: TaxOperator,
    pub include_children: bool,
}

impl FilterClause {
    /// Match any of `terms` (by term ID) or their descendants.
    pub fn term_ids(taxonomy: impl Into<String>, terms: Vec<i64>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            field: TermField::TermId,
            terms,
            operator: TaxOperator::In,
            include_children: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaxQueryNode {
    Clause(FilterClause),
    Group(TaxQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxQuery {
    pub relation: Relation,
    #[serde(rename = "clauses")]
    pub nodes: Vec<TaxQueryNode>,
}

impl Default for TaxQuery {
    fn default() -> Self {
        Self {
            relation: Relation::And,
            nodes: Vec::new(),
        }
    }
}

impl TaxQuery {
    pub fn new(relation: Relation) -> Self {
        Self {
            relation,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, clause: FilterClause) {
        self.nodes.push(TaxQueryNode::Clause(clause));
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Combine with `additions` under `AND`.
    ///
    /// An `AND` tree absorbs the additions directly; any other tree is kept
    /// intact as a nested group.
    pub fn merge_and(existing: Option<TaxQuery>, additions: TaxQuery) -> TaxQuery {
        let Some(existing) = existing.filter(|q| !q.is_empty()) else {
            return additions;
        };
        let mut merged = match existing.relation {
            Relation::And => existing,
            Relation::Or => TaxQuery {
                relation: Relation::And,
                nodes: vec![TaxQueryNode::Group(existing)],
            },
        };
        match additions.relation {
            Relation::And => merged.nodes.extend(additions.nodes),
            Relation::Or if !additions.is_empty() => {
                merged.nodes.push(TaxQueryNode::Group(additions))
            }
            Relation::Or => {}
        }
        merged
    }

    /// All clauses, depth-first in order.
    pub fn clauses(&self) -> Vec<&FilterClause> {
        let mut out = Vec::new();
        let mut stack: Vec<&TaxQueryNode> = self.nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                TaxQueryNode::Clause(clause) => out.push(clause),
                TaxQueryNode::Group(group) => stack.extend(group.nodes.iter().rev()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(relation: Relation, taxonomies: &[&str]) -> TaxQuery {
        let mut query = TaxQuery::new(relation);
        for (i, t) in taxonomies.iter().enumerate() {
            query.push(FilterClause::term_ids(*t, vec![i as i64 + 1]));
        }
        query
    }

    #[test]
    fn test_merge_into_nothing() {
        let merged = TaxQuery::merge_and(None, tree(Relation::And, &["category"]));
        assert_eq!(merged, tree(Relation::And, &["category"]));
    }

    #[test]
    fn test_merge_flattens_and_trees() {
        let existing = tree(Relation::And, &["region"]);
        let merged = TaxQuery::merge_and(Some(existing), tree(Relation::And, &["category"]));
        assert_eq!(merged.relation, Relation::And);
        assert_eq!(merged.nodes.len(), 2);
        let names: Vec<&str> = merged.clauses().iter().map(|c| c.taxonomy.as_str()).collect();
        assert_eq!(names, vec!["region", "category"]);
    }

    #[test]
    fn test_merge_nests_or_trees() {
        let existing = tree(Relation::Or, &["region", "topic"]);
        let category = tree(Relation::And, &["category"]);
        let merged = TaxQuery::merge_and(Some(existing.clone()), category);
        assert_eq!(merged.relation, Relation::And);
        assert_eq!(merged.nodes[0], TaxQueryNode::Group(existing));
        assert_eq!(merged.clauses().len(), 3);
    }

    #[test]
    fn test_serializes_host_layout() {
        let json = serde_json::to_value(FilterClause::term_ids("category", vec![3])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "taxonomy": "category",
                "field": "term_id",
                "terms": [3],
                "operator": "IN",
                "include_children": true
            })
        );
    }

    #[test]
    fn test_rejects_operators_filters_never_build() {
        assert_eq!(serde_json::from_str::<TaxOperator>("\"IN\"").unwrap(), TaxOperator::In);
        assert!(serde_json::from_str::<TaxOperator>("\"NOT IN\"").is_err());
        assert!(serde_json::from_str::<TermField>("\"term_taxonomy_id\"").is_err());
    }
}
