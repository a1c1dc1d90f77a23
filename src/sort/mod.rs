// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result sorting.
//!
//! A chain of rules picks at most one [`SortDirective`] per request; the
//! directive is then applied to the query and, for metadata sorts, the final
//! `ORDER BY` is rewritten so content without the field sorts last.

pub mod orderby;
pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::query::Order;

pub use orderby::{apply_directive, rewrite_orderby, DATE_SORT_CLAUSE, STRING_SORT_CLAUSE};
pub use strategy::{SortBlockConfig, SortInput, SortOutcome, SortResolver, SortRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Title,
    Meta,
}

/// The single sort decision for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub mode: SortMode,
    /// Metadata key for `Meta` sorts
    pub field: Option<String>,
    pub direction: Order,
    pub is_date_like: bool,
}

impl SortDirective {
    pub fn title(direction: Order) -> Self {
        Self {
            mode: SortMode::Title,
            field: None,
            direction,
            is_date_like: false,
        }
    }

    /// Sort by a metadata field. A `posttype:` prefix on the field is dropped.
    pub fn meta(field: &str, direction: Order) -> Self {
        let field = strip_post_type_prefix(field);
        Self {
            mode: SortMode::Meta,
            field: Some(field.to_string()),
            direction,
            is_date_like: is_date_like(field),
        }
    }

    pub fn meta_field(&self) -> Option<&str> {
        match self.mode {
            SortMode::Meta => self.field.as_deref(),
            SortMode::Title => None,
        }
    }
}

/// Fields whose name mentions a date, time or relevance are compared as dates.
pub fn is_date_like(field: &str) -> bool {
    let field = field.to_lowercase();
    ["date", "time", "relevance"].iter().any(|marker| field.contains(marker))
}

/// `document:new_date` → `new_date`
pub fn strip_post_type_prefix(field: &str) -> &str {
    field.rsplit(':').next().unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_date_like() {
        assert!(is_date_like("published_date"));
        assert!(is_date_like("LastUpdateTime"));
        assert!(is_date_like("relevance_score"));
        assert!(!is_date_like("title_sort"));
    }

    #[test]
    fn test_strip_post_type_prefix() {
        assert_eq!(strip_post_type_prefix("document:new_date"), "new_date");
        assert_eq!(strip_post_type_prefix("new_date"), "new_date");
        assert_eq!(strip_post_type_prefix("a:b:c"), "c");
    }

    #[test]
    fn test_meta_directive() {
        let directive = SortDirective::meta("document:published_date", Order::Desc);
        assert_eq!(directive.meta_field(), Some("published_date"));
        assert!(directive.is_date_like);
        assert_eq!(SortDirective::title(Order::Asc).meta_field(), None);
    }
}
