// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Search Augment
//!
//! Metadata and taxonomy aware search for a SQL-backed CMS.
//!
//! The host builds its own post query; this crate hooks into the stages of
//! that build and widens or narrows it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     pre_get_posts                           │
//! │  • taxonomy_<name>=ids  → tax query (AND-merged)            │
//! │  • metadata_<field>=v   → meta query (AND-merged)           │
//! │  • sort rule chain      → title / metadata ordering         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     posts_search                            │
//! │  • keyword × (title, content, excerpt, meta keys, taxa)     │
//! │  • discovered keys/taxonomies cached with a TTL             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          posts_join / posts_distinct / posts_orderby        │
//! │  • aliased postmeta and term joins, once per search         │
//! │  • DISTINCT once joins may duplicate rows                   │
//! │  • metadata sorts keep missing values last                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use search_augment::{AugmentConfig, Host, RequestContext, SearchAugmenter, SearchQuery};
//! use search_augment::storage::{InMemoryStore, Post};
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.register_post_type("post", true);
//! store.insert_post(Post::published(1, "post", "Quarterly").with_meta("department", "Finance"));
//!
//! let host = Host::in_memory(store.clone());
//! let augmenter = SearchAugmenter::new(AugmentConfig::default(), host).unwrap();
//!
//! let mut query = SearchQuery::main_search("finance");
//! let mut ctx = RequestContext::new().with_query_string("s=finance");
//! let sql = augmenter.augment(&mut query, &mut ctx);
//!
//! assert!(sql.join.contains("LEFT JOIN wp_postmeta espm"));
//! assert_eq!(store.execute(&query, &ctx), vec![1]);
//! ```
//!
//! ## Modules
//!
//! - [`augmenter`]: [`SearchAugmenter`], one entry point per host stage
//! - [`search`]: discovery, the search clause AST and its SQL rendering, joins
//! - [`filter`]: taxonomy and metadata URL filters
//! - [`sort`]: the sort rule chain and `ORDER BY` rewriting
//! - [`storage`]: host collaborator traits and an in-memory host
//! - [`cache`]: transient cache trait and a TTL implementation

pub mod augmenter;
pub mod blocks;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod metrics;
pub mod params;
pub mod query;
pub mod search;
pub mod sort;
pub mod storage;

pub use augmenter::{AugmentedSql, Host, SearchAugmenter};
pub use blocks::{Block, ContentObject};
pub use cache::{TransientStore, TtlCache};
pub use config::AugmentConfig;
pub use context::{RequestContext, SearchFields};
pub use error::AugmentError;
pub use hooks::{NoopHooks, SearchHooks};
pub use params::{ParamValue, RequestParams};
pub use query::{Order, OrderBy, Relation, SearchQuery};
pub use search::MetaChange;
pub use sort::{SortDirective, SortMode};
pub use storage::traits::{MetaStore, OptionStore, Registry, StoreError};
