// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! URL-driven result filtering.
//!
//! ```text
//! ?taxonomy_category=3,7   → TaxQuery  (term IDs, IN, include children)
//! ?metadata_color=red,blue → MetaQuery (=, IN; fields under AND)
//! ```
//!
//! Both resolvers merge into whatever tree the query already carries, and may
//! narrow a generic post type to the one the filters belong to.

pub mod meta_query;
pub mod metadata;
pub mod tax_query;
pub mod taxonomy;

pub use meta_query::{MetaClause, MetaCompare, MetaQuery, MetaQueryEntry, MetaQueryNode, MetaType};
pub use metadata::{key_variants, split_selection, MetadataFilter, MetadataFilterResolver};
pub use tax_query::{FilterClause, TaxOperator, TaxQuery, TaxQueryNode, TermField};
pub use taxonomy::{leading_int, parse_term_ids, TaxonomyFilterResolver};
