// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for search-augment.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host is responsible for installing a recorder/exporter.
//!
//! # Metric Naming Convention
//! - `search_augment_` prefix for all metrics
//! - `_total` suffix for counters
//!
//! # Labels
//! - `kind`: meta_keys, taxonomies, meta_values, taxonomy, metadata
//! - `outcome`: hit, miss, error, corrupt
//! - `reason`: why a filter was dropped

use metrics::{counter, histogram};

/// Record a transient cache lookup
pub fn record_cache_lookup(kind: &str, outcome: &str) {
    counter!(
        "search_augment_cache_lookups_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the size of a freshly discovered list
pub fn record_discovery(kind: &str, count: usize) {
    histogram!(
        "search_augment_discovered_items",
        "kind" => kind.to_string()
    )
    .record(count as f64);
}

/// Record a discovery query that failed and degraded to an empty list
pub fn record_discovery_failure(kind: &str) {
    counter!(
        "search_augment_discovery_failures_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a built search fragment
pub fn record_search_clauses(terms: usize, clauses: usize) {
    counter!("search_augment_searches_total").increment(1);
    histogram!("search_augment_search_terms").record(terms as f64);
    histogram!("search_augment_search_clauses").record(clauses as f64);
}

/// Record a filter clause that made it into the query
pub fn record_filter_applied(kind: &str) {
    counter!(
        "search_augment_filters_applied_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a filter parameter that was silently ignored
pub fn record_filter_dropped(kind: &str, reason: &str) {
    counter!(
        "search_augment_filters_dropped_total",
        "kind" => kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record which sort rule handled the request
pub fn record_sort_rule(rule: &str) {
    counter!(
        "search_augment_sort_rule_total",
        "rule" => rule.to_string()
    )
    .increment(1);
}
