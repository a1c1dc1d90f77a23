// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Host data access.
//!
//! [`traits`] defines what the augmenter reads from the host; [`memory`] is a
//! complete in-process host used by tests and embedders without a database.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryStore, Post, PostStatus, Term};
pub use traits::{
    MetaKeyScan, MetaStore, OptionStore, PostTypeInfo, Registry, StoreError, TaxonomyArgs,
    TaxonomyInfo,
};
