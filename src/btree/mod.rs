//! # B+Tree Module
//!
//! This module implements the disk-backed B+Tree that stores fixed-size
//! records addressed by a 32-bit key.
//!
//! ## Architecture Overview
//!
//! - All records live in leaf nodes as `(key, value)` cells sorted by key;
//!   branch nodes hold `(child, key)` separator cells plus one extra
//!   right child.
//! - Leaves are chained into a singly-linked list through `next_leaf`, so
//!   a cursor can scan the whole table in key order without touching
//!   branch nodes.
//! - Nodes occupy exactly one page and reference each other by page
//!   index; the [`Table`] resolves indices through its pager on every
//!   step instead of holding page references across operations.
//!
//! ```text
//!                 [branch, page 0 (root)]
//!                  /         |         \
//!        [leaf 2]  ->  [leaf 3]  ->  [leaf 4]   (next_leaf chain)
//! ```
//!
//! ## Root Stability
//!
//! Callers persist only the root page number, so the root never moves off
//! page 0. When the root overflows, its content is copied to a fresh page
//! and page 0 is rewritten in place as a branch over the copy and the new
//! sibling.
//!
//! ## Branch Key Invariant
//!
//! For every branch cell, `cell.key` equals the maximum key reachable
//! under `cell.child`; the right child dominates all cell keys. Splits
//! maintain this by updating the parent's recorded maximum for the left
//! half before inserting the new right half.
//!
//! ## Module Organization
//!
//! - `leaf` / `branch`: short-lived typed views over a single page
//! - `table`: the tree manager — open, search, insert, splits
//! - `cursor`: forward iterator over the leaf chain
//! - `statement`: thin insert/select adapters for typed callers

mod branch;
mod cursor;
mod leaf;
mod statement;
mod table;

pub use branch::{BranchNode, BranchNodeMut};
pub use cursor::Cursor;
pub use leaf::{leaf_max_cells, LeafNode, LeafNodeMut, SearchResult};
pub use statement::{InsertStatement, Query, SelectStatement, Statement};
pub use table::Table;

use thiserror::Error;

/// The primary key type of records in the tree, stored little-endian
/// inside leaf cells.
pub type KeyType = u32;

/// Serialized size of a key inside a leaf cell.
pub const KEY_SIZE: usize = std::mem::size_of::<KeyType>();

/// Key used by [`Table::start`] to locate the leftmost leaf. The zero key
/// is a legitimate record key; it doubles as the search sentinel because
/// no key sorts below it.
pub(crate) const ZERO_KEY: KeyType = 0;

/// Errors a caller can branch on when driving a [`Table`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The insert value length does not match the table's data size.
    #[error("invalid insert data length {got}, want {want}")]
    DataSizeMismatch { got: usize, want: u16 },

    /// The key already exists at the located position.
    #[error("cannot insert duplicate key {0}")]
    DuplicateKey(KeyType),

    /// Growth would require a split this engine cannot perform.
    #[error("tree growth requires an unsupported split")]
    FatalGrowth,
}
