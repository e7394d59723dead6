use std::{
    collections::{HashMap, HashSet},
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::types::{
    MAX_PAGES, PAGE_SIZE, PageId,
    error::{EngineError, Result},
    node::Node,
};

/// Owns the database file and every resident page buffer. Pages are
/// loaded lazily on first access, mutated in memory, and written back
/// on flush; page numbers grow monotonically and are never reused.
pub struct Pager {
    file: File,
    pages: HashMap<PageId, Node>,
    dirty: HashSet<PageId>,
    num_pages: u64,
    /// Set after an I/O or corruption failure; a poisoned pager refuses
    /// to flush from `Drop` so a half-applied mutation cannot reach disk.
    poisoned: bool,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;
        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(EngineError::CorruptedDatabase {
                reason: format!("file size {file_size} is not a whole number of pages"),
            });
        }
        let num_pages = file_size / PAGE_SIZE as u64;
        log::debug!(
            "opened pager: {} ({num_pages} pages on disk)",
            path.as_ref().display()
        );
        Ok(Self {
            file,
            pages: HashMap::new(),
            dirty: HashSet::new(),
            num_pages,
            poisoned: false,
        })
    }

    /// Number of allocated pages, resident or not.
    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    /// Whether `additional` more pages fit under the page ceiling.
    pub fn can_allocate(&self, additional: u64) -> bool {
        self.num_pages + additional <= MAX_PAGES
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id * PAGE_SIZE as u64
    }

    pub fn get_page(&mut self, page_id: PageId) -> Result<&Node> {
        self.ensure_resident(page_id)?;
        Ok(&self.pages[&page_id])
    }

    /// Exclusive access to a resident page; the page is marked dirty.
    pub fn get_page_mut(&mut self, page_id: PageId) -> Result<&mut Node> {
        self.ensure_resident(page_id)?;
        self.dirty.insert(page_id);
        Ok(self.pages.get_mut(&page_id).unwrap())
    }

    fn ensure_resident(&mut self, page_id: PageId) -> Result<()> {
        if self.pages.contains_key(&page_id) {
            return Ok(());
        }
        if page_id >= self.num_pages {
            return Err(EngineError::PageOutOfBounds {
                page_id,
                allocated: self.num_pages,
            });
        }
        let node = self.load_from_file(page_id).inspect_err(|err| {
            if err.is_fatal() {
                self.poisoned = true;
            }
        })?;
        self.pages.insert(page_id, node);
        Ok(())
    }

    fn load_from_file(&mut self, page_id: PageId) -> Result<Node> {
        let mut buffer = vec![0u8; PAGE_SIZE];
        self.file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        self.file.read_exact(&mut buffer)?;
        Node::from_bytes(page_id, &buffer)
    }

    /// Mark the pager unusable for flushing. Called when a fatal error
    /// interrupts a mutation that already dirtied pages, so the `Drop`
    /// flush cannot persist the half-applied state.
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Reserve the next page number. The page becomes real once the
    /// caller hands its node to `put_page`.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if !self.can_allocate(1) {
            return Err(EngineError::CapacityExceeded {
                requested: self.num_pages + 1,
                max: MAX_PAGES,
            });
        }
        let page_id = self.num_pages;
        self.num_pages += 1;
        log::debug!("allocated page {page_id}");
        Ok(page_id)
    }

    /// Install a page buffer, replacing any resident copy; marks it dirty.
    pub fn put_page(&mut self, node: Node) {
        let page_id = node.page_id();
        self.pages.insert(page_id, node);
        self.dirty.insert(page_id);
    }

    /// Write one page's full block at `page_id * PAGE_SIZE`.
    pub fn flush_page(&mut self, page_id: PageId) -> Result<()> {
        let node = self
            .pages
            .get(&page_id)
            .ok_or(EngineError::PageOutOfBounds {
                page_id,
                allocated: self.num_pages,
            })?;
        let buffer = node.to_bytes();
        self.file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        self.file.write_all(&buffer)?;
        self.dirty.remove(&page_id);
        Ok(())
    }

    /// Flush every dirty resident page and sync the file.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut pending: Vec<PageId> = self.dirty.iter().copied().collect();
        pending.sort_unstable();
        for page_id in pending {
            self.flush_page(page_id).inspect_err(|_| self.poisoned = true)?;
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Flush everything and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        log::debug!("closed pager ({} pages)", self.num_pages);
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if self.poisoned {
            log::warn!("pager dropped after a fatal error; skipping flush");
            return;
        }
        if !self.dirty.is_empty() {
            if let Err(err) = self.flush_all() {
                log::error!("failed to flush pages on drop: {err}");
            }
        }
    }
}
