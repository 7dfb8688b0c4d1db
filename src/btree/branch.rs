//! # Branch Node Views
//!
//! A branch node stores `num_cells` fixed 8-byte `(child, key)` cells
//! after the 12-byte branch header, plus one extra right child in the
//! header itself. Cell keys are ascending, and each key equals the
//! maximum key reachable under the cell's child; the right child holds
//! keys greater than every cell key.
//!
//! ```text
//! +--------------------+-----------------+-----------------+----
//! | BranchHeader (12B) | child 0 | key 0 | child 1 | key 1 | ...
//! +--------------------+-----------------+-----------------+----
//! ```
//!
//! Child lookup accepts an index one past the last cell to mean the
//! right child, which is what `find_key_index` returns when the target
//! exceeds every recorded key.

use eyre::{ensure, Result};
use zerocopy::IntoBytes;

use crate::storage::{
    BranchCell, BranchHeader, NodeType, PagePointer, BRANCH_CELL_SIZE, BRANCH_HEADER_SIZE,
    BRANCH_MAX_CELLS, PAGE_SIZE,
};

use super::KeyType;

#[derive(Debug)]
pub struct BranchNode<'a> {
    data: &'a [u8],
}

pub struct BranchNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> BranchNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = BranchHeader::from_bytes(data)?;
        ensure!(
            header.node().node_type() == NodeType::Branch,
            "expected branch page, got {:?}",
            header.node().node_type()
        );
        ensure!(
            header.node().num_cells() as usize <= BRANCH_MAX_CELLS,
            "file corruption: branch holds {} cells, capacity is {}",
            header.node().num_cells(),
            BRANCH_MAX_CELLS
        );
        Ok(Self { data })
    }

    fn header(&self) -> &BranchHeader {
        // INVARIANT: the page was validated in from_page.
        BranchHeader::from_bytes(self.data).unwrap()
    }

    pub fn cell_count(&self) -> u16 {
        self.header().node().num_cells()
    }

    pub fn is_root(&self) -> bool {
        self.header().node().is_root()
    }

    pub fn parent(&self) -> PagePointer {
        self.header().node().parent()
    }

    pub fn right_child(&self) -> PagePointer {
        self.header().right_child()
    }

    pub fn max_cells(&self) -> u16 {
        BRANCH_MAX_CELLS as u16
    }

    /// Cell counts for the two halves of a split. One of the `max + 1`
    /// keys in play is promoted to the parent, so the halves record one
    /// cell fewer than a leaf split would.
    pub fn split_counts(&self) -> (u16, u16) {
        let max_cells = self.max_cells();
        let old_count = (max_cells + 2) / 2;
        (old_count, max_cells - old_count)
    }

    fn cell_offset(index: u16) -> usize {
        BRANCH_HEADER_SIZE + index as usize * BRANCH_CELL_SIZE
    }

    /// `(child, key)` of the cell at `index`. Precondition: in bounds.
    fn cell(&self, index: u16) -> &BranchCell {
        let offset = Self::cell_offset(index);
        // INVARIANT: cell slots within capacity are always readable.
        BranchCell::from_bytes(&self.data[offset..offset + BRANCH_CELL_SIZE]).unwrap()
    }

    pub fn cell_at(&self, index: u16) -> Result<(PagePointer, KeyType)> {
        ensure!(
            index < self.cell_count(),
            "cell index {} out of bounds (cell_count={})",
            index,
            self.cell_count()
        );
        let cell = self.cell(index);
        Ok((cell.child(), cell.key()))
    }

    pub fn key_at(&self, index: u16) -> Result<KeyType> {
        Ok(self.cell_at(index)?.1)
    }

    /// Page of the child at `index`. An index equal to `cell_count()`
    /// addresses the right child.
    pub fn child_at(&self, index: u16) -> Result<PagePointer> {
        ensure!(
            index <= self.cell_count(),
            "child index {} out of bounds (cell_count={})",
            index,
            self.cell_count()
        );
        if index == self.cell_count() {
            Ok(self.right_child())
        } else {
            Ok(self.cell(index).child())
        }
    }

    /// Highest key recorded in this node's cells. Keys under the right
    /// child are larger but not recorded here.
    pub fn max_key(&self) -> Result<KeyType> {
        ensure!(self.cell_count() > 0, "max_key on empty branch");
        Ok(self.cell(self.cell_count() - 1).key())
    }

    /// Index of the child that could contain `key`: the smallest index
    /// whose cell key is `>= key`, or `cell_count()` (the right child)
    /// when every recorded key is smaller.
    pub fn find_key_index(&self, key: KeyType) -> u16 {
        let mut min_index = 0u16;
        let mut max_index = self.cell_count(); // one more child than keys
        while min_index != max_index {
            let index = (min_index + max_index) / 2;
            let key_to_right = self.cell(index).key();
            if key_to_right >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }
        min_index
    }
}

impl<'a> BranchNodeMut<'a> {
    pub fn from_page(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = BranchHeader::from_bytes(data)?;
        ensure!(
            header.node().node_type() == NodeType::Branch,
            "expected branch page, got {:?}",
            header.node().node_type()
        );
        ensure!(
            header.node().num_cells() as usize <= BRANCH_MAX_CELLS,
            "file corruption: branch holds {} cells, capacity is {}",
            header.node().num_cells(),
            BRANCH_MAX_CELLS
        );
        Ok(Self { data })
    }

    /// Initializes the page as an empty non-root branch. The right child
    /// must be set before the node is usable.
    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() == PAGE_SIZE,
            "invalid page size: {} != {}",
            data.len(),
            PAGE_SIZE
        );
        let header = BranchHeader::from_bytes_mut(data)?;
        header.node_mut().set_node_type(NodeType::Branch);
        header.node_mut().set_root(false);
        header.node_mut().set_num_cells(0);
        header.node_mut().set_parent(0);
        header.set_right_child(0);
        Ok(Self { data })
    }

    pub fn as_ref(&self) -> BranchNode<'_> {
        BranchNode { data: self.data }
    }

    fn header_mut(&mut self) -> &mut BranchHeader {
        // INVARIANT: the page was validated in from_page/init.
        BranchHeader::from_bytes_mut(self.data).unwrap()
    }

    pub fn cell_count(&self) -> u16 {
        self.as_ref().cell_count()
    }

    pub fn max_cells(&self) -> u16 {
        BRANCH_MAX_CELLS as u16
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.header_mut().node_mut().set_root(is_root);
    }

    pub fn set_parent(&mut self, page_num: PagePointer) {
        self.header_mut().node_mut().set_parent(page_num);
    }

    pub fn set_right_child(&mut self, page_num: PagePointer) {
        self.header_mut().set_right_child(page_num);
    }

    pub fn set_cell_count(&mut self, count: u16) {
        self.header_mut().node_mut().set_num_cells(count);
    }

    /// Writes a `(child, key)` cell into slot `index` without touching
    /// the cell count. The slot may sit one past the current count, which
    /// is how a right child is demoted into the cell array.
    pub fn set_cell(&mut self, index: u16, child: PagePointer, key: KeyType) -> Result<()> {
        ensure!(
            index < self.max_cells(),
            "cell index {} exceeds branch capacity {}",
            index,
            self.max_cells()
        );
        let offset = BRANCH_HEADER_SIZE + index as usize * BRANCH_CELL_SIZE;
        self.data[offset..offset + BRANCH_CELL_SIZE]
            .copy_from_slice(BranchCell::new(child, key).as_bytes());
        Ok(())
    }

    /// Replaces the key of an existing cell, keeping its child.
    pub fn set_cell_key(&mut self, index: u16, key: KeyType) -> Result<()> {
        let (child, _) = self.as_ref().cell_at(index)?;
        self.set_cell(index, child, key)
    }

    /// Slides cells at `pos..` one slot right to make room for an
    /// insertion. Precondition: `cell_count() < max_cells()`.
    pub fn make_room_for_insert(&mut self, pos: u16) -> Result<()> {
        ensure!(
            self.cell_count() < self.max_cells(),
            "branch node too big to add room"
        );
        ensure!(
            pos <= self.cell_count(),
            "insert position {} past cell count {}",
            pos,
            self.cell_count()
        );
        let start = BRANCH_HEADER_SIZE + pos as usize * BRANCH_CELL_SIZE;
        let end = BRANCH_HEADER_SIZE + self.cell_count() as usize * BRANCH_CELL_SIZE;
        self.data.copy_within(start..end, start + BRANCH_CELL_SIZE);
        Ok(())
    }

    /// Inserts a `(child, key)` cell at `pos` in a node that has room.
    pub fn insert_direct(&mut self, pos: u16, key: KeyType, child: PagePointer) -> Result<()> {
        ensure!(
            self.cell_count() < self.max_cells(),
            "branch node too big for direct insert"
        );
        self.make_room_for_insert(pos)?;
        self.set_cell(pos, child, key)?;
        let count = self.cell_count();
        self.set_cell_count(count + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_branch(cells: &[(PagePointer, KeyType)], right_child: PagePointer) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = BranchNodeMut::init(&mut page).unwrap();
        for (pos, (child, key)) in cells.iter().enumerate() {
            node.insert_direct(pos as u16, *key, *child).unwrap();
        }
        node.set_right_child(right_child);
        page
    }

    #[test]
    fn capacity_matches_cell_area() {
        assert_eq!(BRANCH_MAX_CELLS, (PAGE_SIZE - 12) / 8);
    }

    #[test]
    fn from_page_rejects_leaf_pages() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = NodeType::Leaf as u8;

        let result = BranchNode::from_page(&page);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("expected branch"));
    }

    #[test]
    fn cells_round_trip() {
        let page = make_branch(&[(2, 10), (3, 20)], 4);
        let node = BranchNode::from_page(&page).unwrap();

        assert_eq!(node.cell_count(), 2);
        assert_eq!(node.cell_at(0).unwrap(), (2, 10));
        assert_eq!(node.cell_at(1).unwrap(), (3, 20));
        assert_eq!(node.right_child(), 4);
        assert_eq!(node.max_key().unwrap(), 20);
    }

    #[test]
    fn child_at_cell_count_is_right_child() {
        let page = make_branch(&[(2, 10), (3, 20)], 4);
        let node = BranchNode::from_page(&page).unwrap();

        assert_eq!(node.child_at(0).unwrap(), 2);
        assert_eq!(node.child_at(1).unwrap(), 3);
        assert_eq!(node.child_at(2).unwrap(), 4);
        assert!(node.child_at(3).is_err());
    }

    #[test]
    fn find_key_index_picks_covering_child() {
        let page = make_branch(&[(2, 10), (3, 20)], 4);
        let node = BranchNode::from_page(&page).unwrap();

        assert_eq!(node.find_key_index(5), 0);
        assert_eq!(node.find_key_index(10), 0);
        assert_eq!(node.find_key_index(11), 1);
        assert_eq!(node.find_key_index(20), 1);
        assert_eq!(node.find_key_index(21), 2);
    }

    #[test]
    fn set_cell_key_keeps_child() {
        let page_data = make_branch(&[(2, 10)], 3);
        let mut page = page_data.clone();
        let mut node = BranchNodeMut::from_page(&mut page).unwrap();

        node.set_cell_key(0, 8).unwrap();

        assert_eq!(node.as_ref().cell_at(0).unwrap(), (2, 8));
    }

    #[test]
    fn insert_direct_keeps_cells_sorted() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut node = BranchNodeMut::init(&mut page).unwrap();

        node.insert_direct(0, 30, 5).unwrap();
        node.insert_direct(0, 10, 3).unwrap();
        node.insert_direct(1, 20, 4).unwrap();

        let view = node.as_ref();
        assert_eq!(view.cell_at(0).unwrap(), (3, 10));
        assert_eq!(view.cell_at(1).unwrap(), (4, 20));
        assert_eq!(view.cell_at(2).unwrap(), (5, 30));
    }

    #[test]
    fn split_counts_consume_all_cells_and_median() {
        let mut page = vec![0u8; PAGE_SIZE];
        let node = BranchNodeMut::init(&mut page).unwrap();
        let view = node.as_ref();

        let (old_count, new_count) = view.split_counts();

        // max cells plus the inserted one, minus the promoted median.
        assert_eq!(old_count + new_count, view.max_cells());
    }
}
