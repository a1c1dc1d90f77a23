// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL Translator
//!
//! Translates the search AST into the MySQL boolean expression appended to
//! the host's search `WHERE` fragment.
//!
//! # SQL Syntax Generated
//!
//! ```sql
//! (wp_posts.post_title LIKE '%term%')                            -- Post column
//! (espm.meta_key = 'color' AND espm.meta_value LIKE '%term%')    -- Metadata
//! (estt.taxonomy = 'category' AND est.name LIKE '%term%')        -- Taxonomy term
//! (wp_posts.post_password = '')                                  -- Equality
//! ```
//!
//! `espm`, `estt` and `est` are the aliases introduced by the
//! [`JoinInjector`](super::JoinInjector).

use super::query_builder::{FieldOperator, FieldQuery, FieldTarget, Query, QueryNode};

/// Alias of the joined postmeta table
pub const META_ALIAS: &str = "espm";
/// Alias of the joined term_relationships table
pub const TERM_RELATIONSHIPS_ALIAS: &str = "estr";
/// Alias of the joined term_taxonomy table
pub const TERM_TAXONOMY_ALIAS: &str = "estt";
/// Alias of the joined terms table
pub const TERMS_ALIAS: &str = "est";

/// SQL translator for search clauses
pub struct SqlTranslator;

impl SqlTranslator {
    /// Translate the AST to an expression with escaped, quoted literals
    ///
    /// This is the form the host's search filter expects: a finished SQL
    /// fragment, like the host's own prepared statements produce.
    pub fn translate(query: &Query, posts_table: &str) -> String {
        Self::translate_node(&query.root, posts_table)
    }

    fn translate_node(node: &QueryNode, posts: &str) -> String {
        match node {
            QueryNode::Field(field) => Self::translate_field(field, posts),
            QueryNode::And(nodes) => Self::translate_group(nodes, " AND ", posts),
            QueryNode::Or(nodes) => Self::translate_group(nodes, " OR ", posts),
        }
    }

    fn translate_group(nodes: &[QueryNode], separator: &str, posts: &str) -> String {
        let parts: Vec<String> = nodes.iter().map(|n| Self::translate_node(n, posts)).collect();
        match parts.len() {
            // An empty group matches nothing rather than producing "()"
            0 => "(1=0)".to_string(),
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => format!("({})", parts.join(separator)),
        }
    }

    fn translate_field(field: &FieldQuery, posts: &str) -> String {
        let (comparison, value) = match field.operator {
            FieldOperator::Equals => ("=", quote_literal(&field.value)),
            FieldOperator::Contains => {
                ("LIKE", quote_literal(&format!("%{}%", esc_like(&field.value))))
            }
        };

        match &field.target {
            FieldTarget::Post(column) => {
                format!("({}.{} {} {})", posts, column.column_name(), comparison, value)
            }
            FieldTarget::Meta { key } => format!(
                "({META_ALIAS}.meta_key = {} AND {META_ALIAS}.meta_value {comparison} {value})",
                quote_literal(key)
            ),
            FieldTarget::Taxonomy { taxonomy } => format!(
                "({TERM_TAXONOMY_ALIAS}.taxonomy = {} AND {TERMS_ALIAS}.name {comparison} {value})",
                quote_literal(taxonomy)
            ),
        }
    }
}

/// Escape `LIKE` wildcards (`%`, `_`) and the escape character itself.
pub fn esc_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Quote a string literal the way MySQL's client escaping does.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\x1a' => quoted.push_str("\\Z"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
