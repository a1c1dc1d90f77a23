// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Augmentation
//!
//! Keyword search across post columns, discovered metadata fields and
//! taxonomy term names.
//!
//! # Architecture
//!
//! ```text
//! Discoverer (meta keys, taxonomies; cached)
//!     ↓
//! SearchClauseBuilder → Query (AST)
//!     ↓
//!     ├─→ SqlTranslator → WHERE fragment
//!     └─→ InMemoryStore::execute (direct evaluation)
//!     ↓
//! JoinInjector → LEFT JOINs + DISTINCT
//! ```

pub mod clause_builder;
pub mod discovery;
pub mod join;
pub mod query_builder;
pub mod sql_translator;

pub use clause_builder::{tokenize, SearchClauseBuilder};
pub use discovery::{filter_metadata_keys, is_excluded_key, Discoverer, MetaChange};
pub use join::JoinInjector;
pub use query_builder::{
    FieldOperator, FieldQuery, FieldTarget, PostColumn, Query, QueryBuilder, QueryNode,
};
pub use sql_translator::{esc_like, quote_literal, SqlTranslator};
