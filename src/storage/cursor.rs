use crate::types::{
    PageId, RowId,
    error::{EngineError, Result},
    row::Row,
};

use crate::storage::{btree::BTree, pager::Pager};

/// Ephemeral position marker over the tree: one cell of one leaf page.
/// Create a fresh cursor per traversal and discard it after any insert
/// that may have split pages underneath it.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub page_id: PageId,
    pub cell_index: usize,
    pub end_of_table: bool,
}

impl Cursor {
    /// Cursor at the leftmost cell of the leftmost leaf. `end_of_table`
    /// is set immediately when the table is empty.
    pub fn table_start(tree: &BTree, pager: &mut Pager) -> Result<Self> {
        let page_id = tree.first_leaf(pager)?;
        let leaf = pager.get_page(page_id)?.as_leaf()?;
        Ok(Self {
            page_id,
            cell_index: 0,
            end_of_table: leaf.cells.is_empty(),
        })
    }

    /// Cursor at `key`, or at its would-be insertion point.
    pub fn find(tree: &BTree, pager: &mut Pager, key: RowId) -> Result<Self> {
        tree.find(pager, key)
    }

    /// Deserialize the row under the cursor.
    pub fn row(&self, pager: &mut Pager) -> Result<Row> {
        let leaf = pager.get_page(self.page_id)?.as_leaf()?;
        let cell = leaf
            .cells
            .get(self.cell_index)
            .ok_or(EngineError::CorruptedPage {
                page_id: self.page_id,
                reason: format!("cursor at cell {} past cell count", self.cell_index),
            })?;
        Row::from_bytes(&cell.payload)
    }

    /// Key under the cursor, read from the cell prefix without a full
    /// row decode.
    pub fn key(&self, pager: &mut Pager) -> Result<RowId> {
        let leaf = pager.get_page(self.page_id)?.as_leaf()?;
        let cell = leaf
            .cells
            .get(self.cell_index)
            .ok_or(EngineError::CorruptedPage {
                page_id: self.page_id,
                reason: format!("cursor at cell {} past cell count", self.cell_index),
            })?;
        Ok(cell.key)
    }

    /// Positioned insertion: hands the row to the engine at this
    /// cursor's position. Discard the cursor afterwards; a split may
    /// have relocated cells underneath it.
    pub fn insert(&self, tree: &mut BTree, pager: &mut Pager, row: &Row) -> Result<()> {
        let payload = row.to_bytes()?;
        tree.insert_at(pager, *self, payload)
    }

    /// Step to the next cell, following the leaf's explicit next-leaf
    /// link past the last cell; sets `end_of_table` on the last leaf.
    pub fn advance(&mut self, pager: &mut Pager) -> Result<()> {
        let leaf = pager.get_page(self.page_id)?.as_leaf()?;
        self.cell_index += 1;
        if self.cell_index >= leaf.cells.len() {
            match leaf.next_leaf {
                Some(next) => {
                    self.page_id = next;
                    self.cell_index = 0;
                }
                None => self.end_of_table = true,
            }
        }
        Ok(())
    }
}
