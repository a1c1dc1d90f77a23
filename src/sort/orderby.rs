// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Applying a sort directive to the query.
//!
//! Metadata sorts add a named `EXISTS OR NOT EXISTS` group on the field so
//! content without it stays in the results, then order by that group. The
//! host's generated `ORDER BY` is replaced so missing values come last in
//! both directions.

use super::{SortDirective, SortMode};
use crate::filter::meta_query::{MetaClause, MetaQuery, MetaQueryEntry, MetaQueryNode, MetaType};
use crate::query::{OrderBy, Relation, SearchQuery};

/// Named meta clause used for date-like sorts
pub const DATE_SORT_CLAUSE: &str = "date_sort_clause";
/// Named meta clause used for plain value sorts
pub const STRING_SORT_CLAUSE: &str = "string_sort_clause";
/// Alias the host gives the first extra postmeta join (the `EXISTS` clause)
pub const SORT_META_ALIAS: &str = "mt1";

/// Set the query variables for `directive`.
pub fn apply_directive(query: &mut SearchQuery, directive: &SortDirective) {
    let order = directive.direction;
    let field = match (directive.mode, directive.field.as_deref()) {
        (SortMode::Title, _) => {
            query.orderby = OrderBy::Title;
            query.order = Some(order);
            return;
        }
        (SortMode::Meta, Some(field)) if !field.is_empty() => field,
        (SortMode::Meta, _) => return,
    };

    let mut meta_query = query.meta_query.take().unwrap_or_default();
    meta_query.name_positional_entries();

    let exists = if directive.is_date_like {
        MetaClause::exists(field).typed(MetaType::Date)
    } else {
        MetaClause::exists(field)
    };
    let group = MetaQuery {
        relation: Relation::Or,
        entries: [exists, MetaClause::not_exists(field)]
            .into_iter()
            .map(|clause| MetaQueryEntry {
                name: None,
                node: MetaQueryNode::Clause(clause),
            })
            .collect(),
    };

    if directive.is_date_like {
        meta_query.push_named(DATE_SORT_CLAUSE, MetaQueryNode::Group(group));
        query.orderby = OrderBy::Clause {
            name: DATE_SORT_CLAUSE.to_string(),
            order,
        };
    } else {
        meta_query.push_named(STRING_SORT_CLAUSE, MetaQueryNode::Group(group));
        query.meta_key = Some(field.to_string());
        query.orderby = OrderBy::MetaValue;
        query.order = Some(order);
    }
    query.meta_query = Some(meta_query);
}

/// The `ORDER BY` for a metadata sort, or `existing` for anything else.
pub fn rewrite_orderby(
    existing: &str,
    directive: Option<&SortDirective>,
    posts_table: &str,
) -> String {
    let Some(directive) = directive.filter(|d| d.meta_field().is_some()) else {
        return existing.to_string();
    };
    let value = if directive.is_date_like {
        format!("CAST({SORT_META_ALIAS}.meta_value AS DATE)")
    } else {
        format!("{SORT_META_ALIAS}.meta_value")
    };
    format!(
        "CASE WHEN {SORT_META_ALIAS}.meta_value IS NULL THEN 1 ELSE 0 END, {value} {}, \
         {posts_table}.ID ASC",
        directive.direction.as_sql()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::meta_query::MetaCompare;
    use crate::query::Order;

    #[test]
    fn test_title_directive() {
        let mut query = SearchQuery::main_search("");
        apply_directive(&mut query, &SortDirective::title(Order::Desc));
        assert_eq!(query.orderby, OrderBy::Title);
        assert_eq!(query.order, Some(Order::Desc));
        assert!(query.meta_query.is_none());
    }

    #[test]
    fn test_string_meta_directive() {
        let mut query = SearchQuery::main_search("");
        apply_directive(&mut query, &SortDirective::meta("department", Order::Asc));

        assert_eq!(query.orderby, OrderBy::MetaValue);
        assert_eq!(query.meta_key.as_deref(), Some("department"));
        let meta_query = query.meta_query.unwrap();
        let Some(MetaQueryNode::Group(group)) = meta_query.named(STRING_SORT_CLAUSE) else {
            panic!("Expected named sort group");
        };
        assert_eq!(group.relation, Relation::Or);
        let compares: Vec<MetaCompare> = group.clauses().iter().map(|c| c.compare).collect();
        assert_eq!(compares, vec![MetaCompare::Exists, MetaCompare::NotExists]);
    }

    #[test]
    fn test_date_meta_directive_orders_by_clause() {
        let mut query = SearchQuery::main_search("");
        apply_directive(&mut query, &SortDirective::meta("published_date", Order::Desc));

        assert_eq!(
            query.orderby,
            OrderBy::Clause {
                name: DATE_SORT_CLAUSE.into(),
                order: Order::Desc
            }
        );
        assert!(query.meta_key.is_none());
        let meta_query = query.meta_query.unwrap();
        assert_eq!(meta_query.clauses()[0].value_type, Some(MetaType::Date));
    }

    #[test]
    fn test_existing_positional_clauses_are_named() {
        let mut existing = MetaQuery::default();
        existing.push(MetaClause::matching("color", vec!["red".into()]));
        let mut query = SearchQuery::main_search("");
        query.meta_query = Some(existing);

        apply_directive(&mut query, &SortDirective::meta("department", Order::Asc));
        let entries = query.meta_query.unwrap().entries;
        let names: Vec<Option<String>> = entries.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec![Some("clause_0".into()), Some(STRING_SORT_CLAUSE.into())]);
    }

    #[test]
    fn test_rewrite_orderby() {
        let string = SortDirective::meta("department", Order::Desc);
        assert_eq!(
            rewrite_orderby("wp_posts.post_date DESC", Some(&string), "wp_posts"),
            "CASE WHEN mt1.meta_value IS NULL THEN 1 ELSE 0 END, \
             mt1.meta_value DESC, wp_posts.ID ASC"
        );

        let date = SortDirective::meta("published_date", Order::Asc);
        assert_eq!(
            rewrite_orderby("", Some(&date), "wp_posts"),
            "CASE WHEN mt1.meta_value IS NULL THEN 1 ELSE 0 END, \
             CAST(mt1.meta_value AS DATE) ASC, wp_posts.ID ASC"
        );
    }

    #[test]
    fn test_rewrite_leaves_other_orders() {
        let title = SortDirective::title(Order::Asc);
        assert_eq!(
            rewrite_orderby("wp_posts.post_title ASC", Some(&title), "wp_posts"),
            "wp_posts.post_title ASC"
        );
        assert_eq!(rewrite_orderby("x", None, "wp_posts"), "x");
    }
}
