//! # Table
//!
//! The table is the B+Tree manager: it owns the pager, knows the record
//! data size, and drives search, insertion, and the split algorithms.
//! Page 0 is the root for the lifetime of the table; root splits rewrite
//! it in place so a persistently stored root page number stays valid.
//!
//! Within a single insert, every page mutation happens before any sync,
//! and the pages a split touches are flushed together (`sync2`/`sync3`)
//! so a reader reopening the file sees either the pre-insert or the
//! post-insert tree, never one side of a split alone.

use std::fmt::Write as _;

use eyre::{bail, Result, WrapErr};
use log::debug;

use crate::storage::{NodeHeader, NodeType, PagePointer, Pager};

use super::branch::{BranchNode, BranchNodeMut};
use super::cursor::Cursor;
use super::leaf::{LeafNode, LeafNodeMut, SearchResult};
use super::{KeyType, TreeError, ZERO_KEY};

const ROOT_PAGE_NUM: PagePointer = 0;

/// A B+Tree of fixed-size records backed by a file.
pub struct Table {
    pub(crate) pager: Pager,
    pub(crate) data_size: u16,
    root_page_num: PagePointer,
}

impl Table {
    /// Opens a table over the given pager. `data_size` is the number of
    /// bytes stored per record in leaf cells. A fresh file gets page 0
    /// initialized as an empty root leaf and synced.
    pub fn open(mut pager: Pager, data_size: u16) -> Result<Self> {
        if pager.num_pages() == 0 {
            // This is a new database file.
            let page = pager.page_mut(ROOT_PAGE_NUM).wrap_err("unable to get root page")?;
            let mut leaf = LeafNodeMut::init(page, data_size)?;
            leaf.set_root(true);
            pager
                .sync1(ROOT_PAGE_NUM)
                .wrap_err("unable to save new database")?;
        }
        Ok(Self {
            pager,
            data_size,
            root_page_num: ROOT_PAGE_NUM,
        })
    }

    /// Size of record data within leaf cells.
    pub fn data_size(&self) -> u16 {
        self.data_size
    }

    /// Page index of the root node. Stable for the table's lifetime.
    pub fn root_page_num(&self) -> PagePointer {
        self.root_page_num
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Returns a cursor at the position of `key`: the matching cell, or
    /// the slot where the key would be inserted in order. The cursor is
    /// guaranteed to point at a leaf node.
    pub fn find(&mut self, key: KeyType) -> Result<Cursor<'_>> {
        let (page_num, result) = self.locate(key)?;
        Ok(Cursor::new(self, page_num, result.index(), false))
    }

    /// Returns a cursor at the first record in the table.
    pub fn start(&mut self) -> Result<Cursor<'_>> {
        let (page_num, result) = self
            .locate(ZERO_KEY)
            .wrap_err("unable to find start of table")?;

        // An empty first leaf means the cursor is done before it begins.
        let page = self.pager.page(page_num).wrap_err("unable to get page")?;
        let leaf = LeafNode::from_page(page, self.data_size)?;
        let end_of_table = leaf.cell_count() == 0;

        Ok(Cursor::new(self, page_num, result.index(), end_of_table))
    }

    /// Inserts a record. The value length must equal the table's data
    /// size, and the key must not already be present.
    pub fn insert(&mut self, key: KeyType, value: &[u8]) -> Result<()> {
        if value.len() != self.data_size as usize {
            return Err(TreeError::DataSizeMismatch {
                got: value.len(),
                want: self.data_size,
            }
            .into());
        }
        let (page_num, result) = self.locate(key).wrap_err("unable to get cursor")?;
        let cell_num = match result {
            SearchResult::Found(_) => return Err(TreeError::DuplicateKey(key).into()),
            SearchResult::NotFound(index) => index,
        };
        self.leaf_insert(page_num, cell_num, key, value)
            .wrap_err("unable to insert record")
    }

    /// Descends from the root to the leaf that covers `key`.
    fn locate(&mut self, key: KeyType) -> Result<(PagePointer, SearchResult)> {
        let mut page_num = self.root_page_num;
        loop {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            match NodeHeader::from_bytes(page)?.node_type() {
                NodeType::Leaf => {
                    let leaf = LeafNode::from_page(page, self.data_size)?;
                    return Ok((page_num, leaf.find_key(key)));
                }
                NodeType::Branch => {
                    let branch = BranchNode::from_page(page)?;
                    let child_index = branch.find_key_index(key);
                    page_num = branch.child_at(child_index)?;
                }
                NodeType::Unknown => {
                    bail!("file corruption: page {} is not a tree node", page_num)
                }
            }
        }
    }

    fn leaf_insert(
        &mut self,
        page_num: PagePointer,
        cell_num: u16,
        key: KeyType,
        value: &[u8],
    ) -> Result<()> {
        let data_size = self.data_size;
        let has_room = {
            let page = self.pager.page_mut(page_num)?;
            let mut leaf = LeafNodeMut::from_page(page, data_size)?;
            if leaf.cell_count() < leaf.max_cells() {
                leaf.insert_direct(cell_num, key, value)?;
                true
            } else {
                false
            }
        };
        if has_room {
            return self.pager.sync1(page_num).wrap_err("unable to sync page");
        }
        self.split_leaf(page_num, key, value)
    }

    /// Splits a full leaf around the incoming `(key, value)`. The upper
    /// cells move to a new right sibling; the parent then learns about
    /// the sibling, creating a new root when the leaf was the root.
    fn split_leaf(&mut self, page_num: PagePointer, key: KeyType, value: &[u8]) -> Result<()> {
        let data_size = self.data_size;

        let (old_max_key, parent, next_leaf, was_root, old_count, mut cells) = {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            let leaf = LeafNode::from_page(page, data_size)?;
            let count = leaf.cell_count();
            let mut cells: Vec<(KeyType, Vec<u8>)> = Vec::with_capacity(count as usize + 1);
            for i in 0..count {
                cells.push((leaf.key_at(i)?, leaf.value_at(i)?.to_vec()));
            }
            let (old_count, _) = leaf.split_counts();
            (
                leaf.max_key()?,
                leaf.parent(),
                leaf.next_leaf(),
                leaf.is_root(),
                old_count,
                cells,
            )
        };

        let pos = cells.iter().position(|(k, _)| *k > key).unwrap_or(cells.len());
        cells.insert(pos, (key, value.to_vec()));

        let (left_cells, right_cells) = cells.split_at(old_count as usize);
        let new_left_max_key = left_cells[left_cells.len() - 1].0;

        let right_page_num = self.pager.unused_page_num();
        debug!("splitting leaf {} into sibling {}", page_num, right_page_num);

        if was_root {
            // Keep the root at its page number: copy the left half onto a
            // fresh page and rewrite the root page as a branch.
            {
                let page = self.pager.page_mut(right_page_num)?;
                let mut right = LeafNodeMut::init(page, data_size)?;
                right.set_parent(page_num);
                right.set_next_leaf(next_leaf);
                for (i, (k, v)) in right_cells.iter().enumerate() {
                    right.put_cell(i as u16, *k, v)?;
                }
                right.set_cell_count(right_cells.len() as u16);
            }
            let left_page_num = self.pager.unused_page_num();
            {
                let page = self.pager.page_mut(left_page_num)?;
                let mut left = LeafNodeMut::init(page, data_size)?;
                left.set_parent(page_num);
                left.set_next_leaf(right_page_num);
                for (i, (k, v)) in left_cells.iter().enumerate() {
                    left.put_cell(i as u16, *k, v)?;
                }
                left.set_cell_count(old_count);
            }
            {
                let page = self.pager.page_mut(page_num)?;
                let mut root = BranchNodeMut::init(page)?;
                root.set_root(true);
                root.set_cell(0, left_page_num, new_left_max_key)?;
                root.set_cell_count(1);
                root.set_right_child(right_page_num);
            }
            debug!(
                "root leaf split: left {} right {} root {}",
                left_page_num, right_page_num, page_num
            );
            self.pager
                .sync3(page_num, left_page_num, right_page_num)
                .wrap_err("unable to sync pages")
        } else {
            {
                let page = self.pager.page_mut(right_page_num)?;
                let mut right = LeafNodeMut::init(page, data_size)?;
                right.set_parent(parent);
                right.set_next_leaf(next_leaf);
                for (i, (k, v)) in right_cells.iter().enumerate() {
                    right.put_cell(i as u16, *k, v)?;
                }
                right.set_cell_count(right_cells.len() as u16);
            }
            {
                let page = self.pager.page_mut(page_num)?;
                let mut left = LeafNodeMut::from_page(page, data_size)?;
                for (i, (k, v)) in left_cells.iter().enumerate() {
                    left.put_cell(i as u16, *k, v)?;
                }
                left.set_cell_count(old_count);
                left.set_next_leaf(right_page_num);
            }
            self.pager
                .sync2(page_num, right_page_num)
                .wrap_err("unable to sync pages")?;
            self.branch_insert_after_split(parent, old_max_key, new_left_max_key, right_page_num)
                .wrap_err("unable to update parent branch")
        }
    }

    /// After a child split, tells the parent branch about the new right
    /// half: the parent's recorded maximum for the shrunken left half is
    /// corrected first, then the new child is inserted.
    fn branch_insert_after_split(
        &mut self,
        page_num: PagePointer,
        old_max: KeyType,
        new_max: KeyType,
        child_page_num: PagePointer,
    ) -> Result<()> {
        self.branch_update_maximum(page_num, old_max, new_max)
            .wrap_err("unable to update maximum")?;
        self.branch_insert(page_num, child_page_num)
    }

    /// Replaces a recorded maximum of `old_max` with `new_max`. When the
    /// old maximum was tracked by a right child it is not recorded in
    /// this node; the update then propagates to the ancestor that owns
    /// it, stopping at the root.
    fn branch_update_maximum(
        &mut self,
        page_num: PagePointer,
        old_max: KeyType,
        new_max: KeyType,
    ) -> Result<()> {
        let (owned_here, is_root, parent) = {
            let page = self.pager.page_mut(page_num).wrap_err("unable to get page")?;
            let mut branch = BranchNodeMut::from_page(page)?;
            let index = branch.as_ref().find_key_index(old_max);
            let owned_here = index < branch.cell_count();
            if owned_here {
                branch.set_cell_key(index, new_max)?;
            }
            (owned_here, branch.as_ref().is_root(), branch.as_ref().parent())
        };
        if owned_here {
            return self.pager.sync1(page_num).wrap_err("unable to sync page");
        }
        if is_root {
            return Ok(());
        }
        self.branch_update_maximum(parent, old_max, new_max)
    }

    /// Inserts a new child into a branch, splitting it when full.
    fn branch_insert(&mut self, page_num: PagePointer, child_page_num: PagePointer) -> Result<()> {
        let child_max_key = self.subtree_max_key(child_page_num)?;

        let (cell_count, max_cells, right_child) = {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            let branch = BranchNode::from_page(page)?;
            (branch.cell_count(), branch.max_cells(), branch.right_child())
        };

        if cell_count < max_cells {
            let right_child_max_key = self.subtree_max_key(right_child)?;
            let page = self.pager.page_mut(page_num)?;
            let mut branch = BranchNodeMut::from_page(page)?;
            if child_max_key > right_child_max_key {
                // The new child holds the largest keys: demote the
                // current right child into the cells and promote the new
                // child in its place.
                branch.set_cell(cell_count, right_child, right_child_max_key)?;
                branch.set_right_child(child_page_num);
                branch.set_cell_count(cell_count + 1);
            } else {
                let index = branch.as_ref().find_key_index(child_max_key);
                branch
                    .insert_direct(index, child_max_key, child_page_num)
                    .wrap_err("unable to insert key")?;
            }
            return self.pager.sync1(page_num).wrap_err("unable to sync page");
        }

        self.split_branch(page_num, child_page_num, child_max_key)
    }

    /// Splits a full branch around the incoming child. The cell set in
    /// play is the node's cells, its demoted right child, and the new
    /// child, sorted by key; the median key is promoted to the parent.
    fn split_branch(
        &mut self,
        page_num: PagePointer,
        child_page_num: PagePointer,
        child_max_key: KeyType,
    ) -> Result<()> {
        let (parent, was_root, right_child, old_count, mut all_cells) = {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            let branch = BranchNode::from_page(page)?;
            let count = branch.cell_count();
            let mut cells: Vec<(PagePointer, KeyType)> = Vec::with_capacity(count as usize + 2);
            for i in 0..count {
                cells.push(branch.cell_at(i)?);
            }
            let (old_count, _) = branch.split_counts();
            (
                branch.parent(),
                branch.is_root(),
                branch.right_child(),
                old_count,
                cells,
            )
        };

        let old_subtree_max = self.subtree_max_key(right_child)?;
        all_cells.push((right_child, old_subtree_max));
        let pos = all_cells
            .iter()
            .position(|(_, k)| *k > child_max_key)
            .unwrap_or(all_cells.len());
        all_cells.insert(pos, (child_page_num, child_max_key));

        let left_cells = &all_cells[..old_count as usize];
        let (left_right_child, promoted_key) = all_cells[old_count as usize];
        let right_cells = &all_cells[old_count as usize + 1..all_cells.len() - 1];
        let right_right_child = all_cells[all_cells.len() - 1].0;

        let right_page_num = self.pager.unused_page_num();
        debug!("splitting branch {} into sibling {}", page_num, right_page_num);
        {
            let page = self.pager.page_mut(right_page_num)?;
            let mut right = BranchNodeMut::init(page)?;
            right.set_parent(parent);
            for (i, (child, key)) in right_cells.iter().enumerate() {
                right.set_cell(i as u16, *child, *key)?;
            }
            right.set_cell_count(right_cells.len() as u16);
            right.set_right_child(right_right_child);
        }

        if was_root {
            // Keep the root at its page number, as with leaf roots.
            let left_page_num = self.pager.unused_page_num();
            {
                let page = self.pager.page_mut(left_page_num)?;
                let mut left = BranchNodeMut::init(page)?;
                left.set_parent(page_num);
                for (i, (child, key)) in left_cells.iter().enumerate() {
                    left.set_cell(i as u16, *child, *key)?;
                }
                left.set_cell_count(old_count);
                left.set_right_child(left_right_child);
            }
            {
                let page = self.pager.page_mut(page_num)?;
                let mut root = BranchNodeMut::init(page)?;
                root.set_root(true);
                root.set_cell(0, left_page_num, promoted_key)?;
                root.set_cell_count(1);
                root.set_right_child(right_page_num);
            }
            debug!(
                "root branch split: left {} right {} root {}",
                left_page_num, right_page_num, page_num
            );
            self.pager
                .sync3(page_num, left_page_num, right_page_num)
                .wrap_err("unable to sync pages")?;
            self.reparent_children(left_page_num)?;
            self.reparent_children(right_page_num)
        } else {
            {
                let page = self.pager.page_mut(page_num)?;
                let mut left = BranchNodeMut::from_page(page)?;
                for (i, (child, key)) in left_cells.iter().enumerate() {
                    left.set_cell(i as u16, *child, *key)?;
                }
                left.set_cell_count(old_count);
                left.set_right_child(left_right_child);
            }
            self.pager
                .sync2(page_num, right_page_num)
                .wrap_err("unable to sync pages")?;
            self.reparent_children(right_page_num)?;
            self.branch_insert_after_split(parent, old_subtree_max, promoted_key, right_page_num)
        }
    }

    /// Points every child of a branch back at it and syncs each child.
    fn reparent_children(&mut self, page_num: PagePointer) -> Result<()> {
        let children = {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            let branch = BranchNode::from_page(page)?;
            let mut children: Vec<PagePointer> =
                Vec::with_capacity(branch.cell_count() as usize + 1);
            for i in 0..branch.cell_count() {
                children.push(branch.cell_at(i)?.0);
            }
            children.push(branch.right_child());
            children
        };
        for child_page_num in children {
            let page = self
                .pager
                .page_mut(child_page_num)
                .wrap_err("unable to get page")?;
            NodeHeader::from_bytes_mut(page)?.set_parent(page_num);
            self.pager
                .sync1(child_page_num)
                .wrap_err("unable to sync child")?;
        }
        Ok(())
    }

    /// Maximum key reachable under `page_num`, found by walking the
    /// right spine down to a leaf.
    fn subtree_max_key(&mut self, page_num: PagePointer) -> Result<KeyType> {
        let mut current = page_num;
        loop {
            let page = self.pager.page(current).wrap_err("unable to get page")?;
            match NodeHeader::from_bytes(page)?.node_type() {
                NodeType::Leaf => return LeafNode::from_page(page, self.data_size)?.max_key(),
                NodeType::Branch => current = BranchNode::from_page(page)?.right_child(),
                NodeType::Unknown => {
                    bail!("file corruption: page {} is not a tree node", current)
                }
            }
        }
    }

    /// Renders the tree structure as an indented listing of pages and
    /// keys. Reads only; intended for diagnostics and tests.
    pub fn dump_tree(&mut self) -> Result<String> {
        let mut out = String::new();
        self.dump_node(self.root_page_num, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&mut self, page_num: PagePointer, depth: usize, out: &mut String) -> Result<()> {
        let indent = "  ".repeat(depth);
        let node_type = {
            let page = self.pager.page(page_num).wrap_err("unable to get page")?;
            NodeHeader::from_bytes(page)?.node_type()
        };
        match node_type {
            NodeType::Leaf => {
                let keys = {
                    let page = self.pager.page(page_num)?;
                    let leaf = LeafNode::from_page(page, self.data_size)?;
                    (0..leaf.cell_count())
                        .map(|i| leaf.key_at(i))
                        .collect::<Result<Vec<_>>>()?
                };
                writeln!(out, "{indent}leaf page {page_num}: {keys:?}")?;
            }
            NodeType::Branch => {
                let (cells, right_child) = {
                    let page = self.pager.page(page_num)?;
                    let branch = BranchNode::from_page(page)?;
                    let cells = (0..branch.cell_count())
                        .map(|i| branch.cell_at(i))
                        .collect::<Result<Vec<_>>>()?;
                    (cells, branch.right_child())
                };
                writeln!(out, "{indent}branch page {page_num}:")?;
                for (child, key) in cells {
                    self.dump_node(child, depth + 1, out)?;
                    writeln!(out, "{indent}  <= {key}")?;
                }
                self.dump_node(right_child, depth + 1, out)?;
            }
            NodeType::Unknown => {
                bail!("file corruption: page {} is not a tree node", page_num)
            }
        }
        Ok(())
    }
}
