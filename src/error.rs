// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

use crate::cache::CacheError;
use crate::storage::traits::StoreError;

/// Internal error type for the augmentation pipeline.
///
/// Lifecycle entry points never return this: they log it and degrade to the
/// unmodified query instead.
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
