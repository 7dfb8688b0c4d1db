//! # Pager
//!
//! The pager owns a regular file and an in-memory cache of fixed-size
//! pages. Pages are read on demand with positional I/O and stay cached for
//! the lifetime of the pager; there is no eviction. Durability is explicit:
//! mutating a cached page does nothing to the file until the page is
//! flushed, and `sync1`/`sync2`/`sync3` flush-and-sync the page groups a
//! tree operation mutates together.
//!
//! New pages are always allocated at the end of the file
//! (`unused_page_num`); freed pages are never recycled. Dropping the pager
//! releases the file descriptor without flushing.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use log::debug;
use thiserror::Error;

use super::{Page, PagePointer, PAGE_SIZE};

/// The backing file does not divide evenly into pages.
#[derive(Debug, Error)]
#[error("file corruption: {size} bytes is not a whole number of {page_size}-byte pages")]
pub struct CorruptionError {
    pub size: u64,
    pub page_size: usize,
}

pub struct Pager {
    file: File,
    file_length: u64,
    pages: Vec<Option<Box<Page>>>,
    num_pages: PagePointer,
}

impl Pager {
    /// Opens the database file at `path`, creating it if it does not
    /// exist. Fails with [`CorruptionError`] when the existing file size
    /// is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("unable to open file '{}'", path.display()))?;
        let file_length = file
            .metadata()
            .wrap_err_with(|| format!("unable to stat file '{}'", path.display()))?
            .len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(CorruptionError {
                size: file_length,
                page_size: PAGE_SIZE,
            }
            .into());
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as PagePointer;
        debug!("opened '{}' with {} pages", path.display(), num_pages);
        Ok(Self {
            file,
            file_length,
            pages: Vec::new(),
            num_pages,
        })
    }

    /// Number of pages known to the pager, cached or on disk.
    pub fn num_pages(&self) -> PagePointer {
        self.num_pages
    }

    /// Returns the next available page index. Until pages are recycled,
    /// new pages always go onto the end of the database file.
    pub fn unused_page_num(&self) -> PagePointer {
        self.num_pages
    }

    /// Returns the page at `index`, loading it from disk on a cache miss.
    /// Pages past the end of the file are served zero-filled.
    pub fn page(&mut self, index: PagePointer) -> Result<&Page> {
        Ok(self.load(index)?)
    }

    /// Mutable variant of [`Pager::page`]. Mutations are observable to
    /// later fetches of the same index but reach disk only on flush.
    pub fn page_mut(&mut self, index: PagePointer) -> Result<&mut Page> {
        self.load(index)
    }

    fn load(&mut self, index: PagePointer) -> Result<&mut Page> {
        let slot = index as usize;
        if slot >= self.pages.len() {
            self.pages.resize_with(slot + 1, || None);
        }
        if self.pages[slot].is_none() {
            // Cache miss. Allocate memory and load from file if the page
            // already exists on disk.
            let mut page: Box<Page> = Box::new([0u8; PAGE_SIZE]);
            let pages_on_disk = self.file_length / PAGE_SIZE as u64;
            if (index as u64) < pages_on_disk {
                self.file
                    .seek(SeekFrom::Start(index as u64 * PAGE_SIZE as u64))
                    .wrap_err("error seeking to read position")?;
                self.file
                    .read_exact(&mut page[..])
                    .wrap_err_with(|| format!("error reading page {}", index))?;
            }
            self.pages[slot] = Some(page);
            if index >= self.num_pages {
                self.num_pages = index + 1;
            }
        }
        // INVARIANT: the slot was filled above.
        Ok(self.pages[slot].as_deref_mut().unwrap())
    }

    /// Writes the cached page at `index` back to disk. When `sync` is
    /// set, the written range is also flushed to stable storage.
    pub fn flush(&mut self, index: PagePointer, sync: bool) -> Result<()> {
        ensure!(
            (index as usize) < self.pages.len(),
            "tried to flush page {} out of range",
            index
        );
        let page = self.pages[index as usize]
            .as_deref()
            .ok_or_else(|| eyre::eyre!("tried to flush unloaded page {}", index))?;
        let offset = index as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .wrap_err("error seeking to flush position")?;
        self.file
            .write_all(&page[..])
            .wrap_err_with(|| format!("error writing page {}", index))?;
        if offset + PAGE_SIZE as u64 > self.file_length {
            self.file_length = offset + PAGE_SIZE as u64;
        }
        if sync {
            self.file.sync_data().wrap_err("error syncing page")?;
        }
        Ok(())
    }

    pub fn sync1(&mut self, index: PagePointer) -> Result<()> {
        self.flush(index, true).wrap_err("sync error")
    }

    pub fn sync2(&mut self, index1: PagePointer, index2: PagePointer) -> Result<()> {
        let first = self.flush(index1, true);
        let second = self.flush(index2, true);
        combine("sync error", [first, second])
    }

    pub fn sync3(
        &mut self,
        index1: PagePointer,
        index2: PagePointer,
        index3: PagePointer,
    ) -> Result<()> {
        let first = self.flush(index1, true);
        let second = self.flush(index2, true);
        let third = self.flush(index3, true);
        combine("sync error", [first, second, third])
    }
}

impl std::fmt::Debug for Pager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager")
            .field("file_length", &self.file_length)
            .field("num_pages", &self.num_pages)
            .field("cached", &self.pages.iter().filter(|p| p.is_some()).count())
            .finish()
    }
}

/// Collapses simultaneous failures into one report naming the operation
/// once and the sub-errors as causes.
fn combine<I>(msg: &str, results: I) -> Result<()>
where
    I: IntoIterator<Item = Result<()>>,
{
    let mut failures: Vec<eyre::Report> = results.into_iter().filter_map(|r| r.err()).collect();
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0).wrap_err(msg.to_string())),
        _ => {
            let causes = failures
                .iter()
                .map(|e| format!("{e:#}"))
                .collect::<Vec<_>>()
                .join(", ");
            Err(eyre::eyre!("{msg} (multiple errors): {causes}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("test.db")).unwrap();

        assert_eq!(pager.num_pages(), 0);
        assert_eq!(pager.unused_page_num(), 0);
    }

    #[test]
    fn open_rejects_partial_page_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        fs::write(&path, vec![0u8; PAGE_SIZE + 100]).unwrap();

        let result = Pager::open(&path);

        assert!(result.is_err());
        let report = result.unwrap_err();
        assert!(report.to_string().contains("file corruption"));
        assert!(report.downcast_ref::<CorruptionError>().is_some());
    }

    #[test]
    fn fresh_page_is_zero_filled() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let page = pager.page(0).unwrap();

        assert!(page.iter().all(|&b| b == 0));
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn page_mut_changes_survive_flush_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            pager.page_mut(0).unwrap()[0..4].copy_from_slice(b"data");
            pager.page_mut(2).unwrap()[10] = 0xAB;
            pager.flush(0, true).unwrap();
            pager.flush(1, false).unwrap();
            pager.flush(2, true).unwrap();
        }

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 3);
        assert_eq!(&pager.page(0).unwrap()[0..4], b"data");
        assert_eq!(pager.page(2).unwrap()[10], 0xAB);
    }

    #[test]
    fn mutations_are_visible_to_later_fetches() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        pager.page_mut(0).unwrap()[100] = 42;

        assert_eq!(pager.page(0).unwrap()[100], 42);
    }

    #[test]
    fn unused_page_num_advances_with_cache_growth() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        pager.page(0).unwrap();
        assert_eq!(pager.unused_page_num(), 1);

        pager.page(4).unwrap();
        assert_eq!(pager.unused_page_num(), 5);
    }

    #[test]
    fn flush_out_of_range_fails() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();

        let result = pager.flush(3, false);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn sync1_flushes_durably() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            pager.page_mut(0).unwrap()[0] = 7;
            pager.sync1(0).unwrap();
        }

        assert_eq!(fs::metadata(&path).unwrap().len(), PAGE_SIZE as u64);
    }

    #[test]
    fn sync2_and_sync3_flush_all_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            for i in 0..5u32 {
                pager.page_mut(i).unwrap()[0] = i as u8 + 1;
            }
            pager.sync2(0, 1).unwrap();
            pager.sync3(2, 3, 4).unwrap();
        }

        let mut pager = Pager::open(&path).unwrap();
        for i in 0..5u32 {
            assert_eq!(pager.page(i).unwrap()[0], i as u8 + 1);
        }
    }

    #[test]
    fn sync2_reports_flush_failure_with_context() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db")).unwrap();
        pager.page_mut(0).unwrap()[0] = 1;

        // Page 9 was never loaded, so its flush fails while page 0 succeeds.
        let result = pager.sync2(0, 9);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("sync error"));
    }
}
