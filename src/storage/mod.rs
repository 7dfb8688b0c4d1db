//! # Storage Module
//!
//! The storage layer owns the database file and presents it as a vector of
//! fixed-size pages. It has two halves:
//!
//! - `pager`: opens the file, caches pages in memory, reads them on demand
//!   with ordinary positional I/O, and flushes individual pages durably.
//! - `page`: the on-page node layout shared by the B+Tree — a common node
//!   header plus leaf- and branch-specific trailers, all accessed through
//!   typed `zerocopy` overlays.
//!
//! ## Page Layout
//!
//! Every page is 4096 bytes and plays one of two roles, discriminated by
//! the first byte:
//!
//! ```text
//! Offset  Size  Field        Description
//! ------  ----  -----------  -----------------------------------------
//! 0       1     node_type    0x01 = branch, 0x02 = leaf
//! 1       1     is_root      1 iff this page is the tree root
//! 2       2     num_cells    number of cells in the node (u16 LE)
//! 4       4     parent       parent page index (u32 LE); root: unused
//! 8       4     next_leaf    (leaf) right sibling page, 0 = none
//! 8       4     right_child  (branch) child past the last cell
//! 12      —     cell area    leaf: key+value cells; branch: child+key
//! ```
//!
//! All multi-byte on-page integers are little-endian, so a database file is
//! portable across host byte orders.
//!
//! ## Ownership Model
//!
//! The pager owns the page cache; node views (`btree` module) are
//! short-lived borrows of a single cached page. Pages refer to each other
//! by `PagePointer` index, never by reference, so growing the cache never
//! invalidates the tree structure — callers re-fetch pages by index.

mod page;
mod pager;

pub use page::{
    BranchCell, BranchHeader, LeafHeader, NodeHeader, NodeType, BRANCH_CELL_SIZE,
    BRANCH_HEADER_SIZE, BRANCH_MAX_CELLS, LEAF_HEADER_SIZE, NODE_HEADER_SIZE,
};
pub use pager::{CorruptionError, Pager};

/// Size of a single page, the unit of I/O.
pub const PAGE_SIZE: usize = 4096;

/// Index of a page within the database file.
pub type PagePointer = u32;

/// A page-sized byte block.
pub type Page = [u8; PAGE_SIZE];
