//! # Node Layout
//!
//! This module defines the typed overlays used to interpret a page as a
//! B+Tree node. Every node starts with an 8-byte [`NodeHeader`]; leaves and
//! branches extend it with one extra page pointer each:
//!
//! ```text
//! NodeHeader (8 bytes)           LeafHeader (12)      BranchHeader (12)
//! +-----------+----------+       +--------------+     +--------------+
//! | node_type | is_root  |       | NodeHeader   |     | NodeHeader   |
//! | num_cells | parent   |       | next_leaf    |     | right_child  |
//! +-----------+----------+       +--------------+     +--------------+
//! ```
//!
//! The overlays use `zerocopy` with explicitly little-endian field types,
//! so reads and writes go straight to the page bytes without copying and
//! without alignment requirements on the page buffer.
//!
//! Branch cells are fixed 8-byte `(child, key)` pairs. Leaf cells are laid
//! out by the `btree::leaf` views because their size depends on the
//! table's configured data size.

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{PagePointer, PAGE_SIZE};

pub const NODE_HEADER_SIZE: usize = 8;
pub const LEAF_HEADER_SIZE: usize = 12;
pub const BRANCH_HEADER_SIZE: usize = 12;
pub const BRANCH_CELL_SIZE: usize = 8;

/// Maximum number of `(child, key)` cells a branch node can hold; the
/// right child pointer lives in the header and is not counted.
pub const BRANCH_MAX_CELLS: usize = (PAGE_SIZE - BRANCH_HEADER_SIZE) / BRANCH_CELL_SIZE;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Unknown = 0x00,
    Branch = 0x01,
    Leaf = 0x02,
}

impl NodeType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => NodeType::Branch,
            0x02 => NodeType::Leaf,
            _ => NodeType::Unknown,
        }
    }
}

/// Header common to leaf and branch nodes.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    node_type: u8,
    is_root: u8,
    num_cells: U16<LittleEndian>,
    parent: U32<LittleEndian>,
}

impl NodeHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::mut_from_bytes(&mut data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read NodeHeader: {:?}", e))
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::from_byte(self.node_type)
    }

    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.node_type = node_type as u8;
    }

    pub fn is_root(&self) -> bool {
        self.is_root != 0
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.is_root = is_root as u8;
    }

    pub fn num_cells(&self) -> u16 {
        self.num_cells.get()
    }

    pub fn set_num_cells(&mut self, count: u16) {
        self.num_cells.set(count);
    }

    pub fn parent(&self) -> PagePointer {
        self.parent.get()
    }

    pub fn set_parent(&mut self, page_num: PagePointer) {
        self.parent.set(page_num);
    }
}

/// Header of a leaf node: the common header plus the right-sibling link.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct LeafHeader {
    node: NodeHeader,
    next_leaf: U32<LittleEndian>,
}

impl LeafHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for LeafHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read LeafHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for LeafHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::mut_from_bytes(&mut data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read LeafHeader: {:?}", e))
    }

    pub fn node(&self) -> &NodeHeader {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut NodeHeader {
        &mut self.node
    }

    /// Page of the right sibling leaf; 0 means no sibling.
    pub fn next_leaf(&self) -> PagePointer {
        self.next_leaf.get()
    }

    pub fn set_next_leaf(&mut self, page_num: PagePointer) {
        self.next_leaf.set(page_num);
    }
}

/// Header of a branch node: the common header plus the extra child that
/// holds keys greater than every cell key.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BranchHeader {
    node: NodeHeader,
    right_child: U32<LittleEndian>,
}

impl BranchHeader {
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for BranchHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read BranchHeader: {:?}", e))
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for BranchHeader: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::mut_from_bytes(&mut data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read BranchHeader: {:?}", e))
    }

    pub fn node(&self) -> &NodeHeader {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut NodeHeader {
        &mut self.node
    }

    pub fn right_child(&self) -> PagePointer {
        self.right_child.get()
    }

    pub fn set_right_child(&mut self, page_num: PagePointer) {
        self.right_child.set(page_num);
    }
}

/// A single cell within a branch node.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, PartialEq, Eq)]
pub struct BranchCell {
    child: U32<LittleEndian>,
    key: U32<LittleEndian>,
}

impl BranchCell {
    pub fn new(child: PagePointer, key: u32) -> Self {
        Self {
            child: U32::new(child),
            key: U32::new(key),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        ensure!(
            data.len() >= size_of::<Self>(),
            "buffer too small for BranchCell: {} < {}",
            data.len(),
            size_of::<Self>()
        );
        Self::ref_from_bytes(&data[..size_of::<Self>()])
            .map_err(|e| eyre::eyre!("failed to read BranchCell: {:?}", e))
    }

    /// Page pointed to by this cell.
    pub fn child(&self) -> PagePointer {
        self.child.get()
    }

    /// Maximum key reachable under `child`.
    pub fn key(&self) -> u32 {
        self.key.get()
    }
}
