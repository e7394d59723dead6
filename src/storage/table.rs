use std::path::Path;

use crate::types::{
    error::Result,
    node::{LeafNode, Node},
    row::Row,
};

use crate::storage::{btree::BTree, cursor::Cursor, pager::Pager};

/// Top-level handle over one database file: a pager plus the B-tree
/// rooted at page 0. The external command loop only ever talks to this.
pub struct Table {
    pager: Pager,
    tree: BTree,
}

impl Table {
    /// Open (or create) the database file at `path`. A fresh file gets
    /// its root allocated lazily as an empty leaf at page 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(&path)?;
        if pager.num_pages() == 0 {
            let root_id = pager.allocate_page()?;
            pager.put_page(Node::Leaf(LeafNode::new(root_id)));
            log::info!("created database at {}", path.as_ref().display());
        } else {
            log::info!(
                "opened database at {} ({} pages)",
                path.as_ref().display(),
                pager.num_pages()
            );
        }
        Ok(Self {
            pager,
            tree: BTree::new(),
        })
    }

    pub fn insert(&mut self, row: &Row) -> Result<()> {
        self.tree.insert(&mut self.pager, row)
    }

    /// Lazy, ordered scan over every row. Each call builds a fresh
    /// cursor, so the scan is restartable.
    pub fn select(&mut self) -> Result<Rows<'_>> {
        let cursor = Cursor::table_start(&self.tree, &mut self.pager)?;
        Ok(Rows {
            pager: &mut self.pager,
            cursor,
        })
    }

    /// Flush every dirty page and release the file.
    pub fn close(self) -> Result<()> {
        let Table { pager, .. } = self;
        pager.close()
    }

    /// Tree dump for the REPL's `.btree` meta-command.
    pub fn render_tree(&mut self) -> Result<String> {
        self.tree.render(&mut self.pager)
    }
}

/// Ordered row iterator backed by one cursor. Yields `Err` once and
/// stops if a page turns out to be unreadable mid-scan.
pub struct Rows<'a> {
    pager: &'a mut Pager,
    cursor: Cursor,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.end_of_table {
            return None;
        }
        let row = match self.cursor.row(self.pager) {
            Ok(row) => row,
            Err(err) => {
                self.cursor.end_of_table = true;
                return Some(Err(err));
            }
        };
        if let Err(err) = self.cursor.advance(self.pager) {
            self.cursor.end_of_table = true;
            return Some(Err(err));
        }
        Some(Ok(row))
    }
}
