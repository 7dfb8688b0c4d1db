//! # Cursor
//!
//! A cursor walks a table's records in key order: within a leaf cell by
//! cell, then across leaves through the `next_leaf` chain. The cursor
//! borrows its table mutably for its whole lifetime, so inserts cannot
//! invalidate the leaf it is standing on.
//!
//! The first error hit while reading or advancing is latched; every
//! later call returns it and `end()` reports true.

use eyre::{bail, Result};

use crate::storage::PagePointer;

use super::leaf::LeafNode;
use super::{KeyType, Table};

/// Forward-only iterator over a table's leaf cells.
pub struct Cursor<'t> {
    table: &'t mut Table,
    page_num: PagePointer,
    cell_num: u16,
    end_of_table: bool,
    advance_error: Option<String>,
}

impl<'t> Cursor<'t> {
    pub(crate) fn new(
        table: &'t mut Table,
        page_num: PagePointer,
        cell_num: u16,
        end_of_table: bool,
    ) -> Self {
        Self {
            table,
            page_num,
            cell_num,
            end_of_table,
            advance_error: None,
        }
    }

    /// Page of the leaf the cursor points at.
    pub fn page_num(&self) -> PagePointer {
        self.page_num
    }

    /// Cell index within the current leaf.
    pub fn cell_num(&self) -> u16 {
        self.cell_num
    }

    /// The `(key, value)` of the current cell. The value bytes alias the
    /// page cache and stay valid until the cursor moves.
    pub fn value(&mut self) -> Result<(KeyType, &[u8])> {
        if let Some(message) = &self.advance_error {
            bail!("{message}");
        }
        let data_size = self.table.data_size;
        let page = match self.table.pager.page(self.page_num) {
            Ok(page) => page,
            Err(err) => {
                let message = format!("unable to get page: {err:#}");
                self.advance_error = Some(message.clone());
                bail!("{message}");
            }
        };
        // The cursor always points at a leaf node.
        let leaf = LeafNode::from_page(page, data_size)?;
        leaf.cell_at(self.cell_num)
    }

    /// Advances to the next cell, following the sibling chain across
    /// leaves. Past the rightmost cell the cursor reports `end()`.
    pub fn next(&mut self) {
        if self.advance_error.is_some() || self.end_of_table {
            return;
        }
        let data_size = self.table.data_size;
        let page = match self.table.pager.page(self.page_num) {
            Ok(page) => page,
            Err(err) => {
                self.advance_error = Some(format!("unable to get page: {err:#}"));
                return;
            }
        };
        let leaf = match LeafNode::from_page(page, data_size) {
            Ok(leaf) => leaf,
            Err(err) => {
                self.advance_error = Some(format!("{err:#}"));
                return;
            }
        };
        if self.cell_num + 1 < leaf.cell_count() {
            self.cell_num += 1;
        } else if leaf.next_leaf() != 0 {
            // Move to the next page.
            self.page_num = leaf.next_leaf();
            self.cell_num = 0;
        } else {
            // This was the rightmost leaf.
            self.end_of_table = true;
        }
    }

    /// True when the cursor can no longer advance.
    pub fn end(&self) -> bool {
        self.end_of_table || self.advance_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Pager;
    use crate::btree::Table;
    use tempfile::tempdir;

    const DATA_SIZE: u16 = 8;

    fn value(n: u64) -> Vec<u8> {
        n.to_le_bytes().to_vec()
    }

    #[test]
    fn traverses_cells_in_key_order() {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("test.db")).unwrap();
        let mut table = Table::open(pager, DATA_SIZE).unwrap();
        for key in [7u32, 3, 5] {
            table.insert(key, &value(key as u64)).unwrap();
        }

        let mut cursor = table.start().unwrap();
        let mut seen = Vec::new();
        while !cursor.end() {
            let (key, bytes) = cursor.value().unwrap();
            assert_eq!(bytes, &value(key as u64)[..]);
            seen.push(key);
            cursor.next();
        }

        assert_eq!(seen, vec![3, 5, 7]);
    }

    #[test]
    fn next_past_end_is_a_no_op() {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("test.db")).unwrap();
        let mut table = Table::open(pager, DATA_SIZE).unwrap();
        table.insert(1, &value(1)).unwrap();

        let mut cursor = table.start().unwrap();
        cursor.next();
        assert!(cursor.end());
        cursor.next();
        assert!(cursor.end());
    }
}
