// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed content block tree.
//!
//! Page content arrives as the host's parsed block list (`blockName`, `attrs`,
//! `innerBlocks`). Only the metadata filter block carries meaning here; every
//! other block is kept for its children.

use std::ops::ControlFlow;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Block name of the metadata filter block stored in host content.
pub const METADATA_FILTER_BLOCK: &str = "wordpress-search/search-metadata-filter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    MetadataFilter {
        /// `posttype:field` selection, when configured
        selected_metadata: Option<String>,
        inner_blocks: Vec<Block>,
    },
    Other {
        name: Option<String>,
        inner_blocks: Vec<Block>,
    },
}

impl Block {
    pub fn inner_blocks(&self) -> &[Block] {
        match self {
            Block::MetadataFilter { inner_blocks, .. } | Block::Other { inner_blocks, .. } => {
                inner_blocks
            }
        }
    }

    fn from_raw(raw: RawBlock) -> Self {
        let inner_blocks = raw.inner_blocks.into_iter().map(Block::from_raw).collect();
        match raw.block_name {
            Some(name) if name == METADATA_FILTER_BLOCK => Block::MetadataFilter {
                selected_metadata: raw
                    .attrs
                    .get("selectedMetadata")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                inner_blocks,
            },
            name => Block::Other { name, inner_blocks },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    #[serde(default)]
    block_name: Option<String>,
    #[serde(default)]
    attrs: serde_json::Map<String, Value>,
    #[serde(default)]
    inner_blocks: Vec<RawBlock>,
}

/// Decode a parsed block list. Malformed input yields no blocks.
pub fn parse_blocks(value: Value) -> Vec<Block> {
    match serde_json::from_value::<Vec<RawBlock>>(value) {
        Ok(raw) => raw.into_iter().map(Block::from_raw).collect(),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed block tree");
            Vec::new()
        }
    }
}

/// Visitor over a block tree. Returning `Break` stops the walk.
pub trait BlockVisitor {
    type Output;

    fn visit(&mut self, block: &Block) -> ControlFlow<Self::Output>;
}

/// Depth-first, pre-order walk in document order.
pub fn walk<V: BlockVisitor>(blocks: &[Block], visitor: &mut V) -> Option<V::Output> {
    let mut stack: Vec<&Block> = blocks.iter().rev().collect();
    while let Some(block) = stack.pop() {
        if let ControlFlow::Break(found) = visitor.visit(block) {
            return Some(found);
        }
        stack.extend(block.inner_blocks().iter().rev());
    }
    None
}

/// The page object whose content is being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentObject {
    pub id: u64,
    pub blocks: Vec<Block>,
}

impl ContentObject {
    pub fn new(id: u64, blocks: Vec<Block>) -> Self {
        Self { id, blocks }
    }
}
