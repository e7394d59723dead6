use std::fmt::Write as _;

use crate::types::{
    PageId, ROW_SIZE, RowId,
    error::{EngineError, Result},
    node::{InternalCell, InternalNode, LeafCell, LeafNode, Node},
    row::Row,
};

use crate::storage::{cursor::Cursor, pager::Pager};

/// The root never moves: splits of page 0 relocate the lower half into a
/// fresh page and rewrite page 0 in place, so reopening a file needs no
/// header to find the tree.
pub const ROOT_PAGE_ID: PageId = 0;

/// Balanced search tree over the pager's pages. Keys within a node are
/// strictly increasing; an internal cell `(k, c)` bounds every key in
/// subtree `c` strictly below `k`.
#[derive(Debug, Clone, Copy)]
pub struct BTree {
    root_page_id: PageId,
}

impl BTree {
    pub fn new() -> Self {
        Self {
            root_page_id: ROOT_PAGE_ID,
        }
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Position a cursor at `key`, or at the cell where it would be
    /// inserted to keep the leaf ordered.
    pub fn find(&self, pager: &mut Pager, key: RowId) -> Result<Cursor> {
        let leaf_id = self.find_leaf(pager, key)?;
        let leaf = pager.get_page(leaf_id)?.as_leaf()?;
        let cell_index = leaf.find_cell(key);
        let end_of_table = cell_index >= leaf.cells.len() && leaf.next_leaf.is_none();
        Ok(Cursor {
            page_id: leaf_id,
            cell_index,
            end_of_table,
        })
    }

    /// Leaf page whose key range contains `key`.
    pub fn find_leaf(&self, pager: &mut Pager, key: RowId) -> Result<PageId> {
        let mut page_id = self.root_page_id;
        loop {
            match pager.get_page(page_id)? {
                Node::Leaf(_) => return Ok(page_id),
                Node::Internal(internal) => page_id = internal.find_child(key),
            }
        }
    }

    /// Leftmost leaf of the tree.
    pub fn first_leaf(&self, pager: &mut Pager) -> Result<PageId> {
        let mut page_id = self.root_page_id;
        loop {
            match pager.get_page(page_id)? {
                Node::Leaf(_) => return Ok(page_id),
                Node::Internal(internal) => page_id = internal.leftmost_child(),
            }
        }
    }

    pub fn insert(&mut self, pager: &mut Pager, row: &Row) -> Result<()> {
        // Serialize before touching any page: a validation failure must
        // leave the tree exactly as it was.
        let payload = row.to_bytes()?;
        let cursor = self.find(pager, row.id)?;
        self.insert_at(pager, cursor, payload)
    }

    /// Insert a serialized row at a position produced by `find`. The
    /// cursor must not have outlived an intervening mutation.
    pub fn insert_at(
        &mut self,
        pager: &mut Pager,
        cursor: Cursor,
        payload: [u8; ROW_SIZE],
    ) -> Result<()> {
        let result = self.insert_in_leaf(pager, cursor, payload);
        if let Err(err) = &result {
            // A fatal failure past the first page write leaves a
            // half-applied split in the cache; it must never be flushed.
            if err.is_fatal() {
                pager.poison();
            }
        }
        result
    }

    fn insert_in_leaf(
        &mut self,
        pager: &mut Pager,
        cursor: Cursor,
        payload: [u8; ROW_SIZE],
    ) -> Result<()> {
        let key = Row::key_of(&payload);
        let leaf = pager.get_page(cursor.page_id)?.as_leaf()?;
        if leaf
            .cells
            .get(cursor.cell_index)
            .is_some_and(|cell| cell.key == key)
        {
            return Err(EngineError::DuplicateKey { key });
        }

        if !leaf.is_full() {
            let leaf = pager.get_page_mut(cursor.page_id)?.as_leaf_mut()?;
            leaf.cells.insert(cursor.cell_index, LeafCell::new(payload));
            return Ok(());
        }

        self.ensure_split_capacity(pager, cursor.page_id)?;
        log::debug!("splitting leaf {} for key {key}", cursor.page_id);
        self.split_leaf(pager, cursor.page_id, cursor.cell_index, LeafCell::new(payload))
    }

    /// Count the pages the split chain starting at `leaf_id` will
    /// allocate and check the ceiling up front, so a capacity failure
    /// can never interrupt a half-applied split.
    fn ensure_split_capacity(&self, pager: &mut Pager, leaf_id: PageId) -> Result<u64> {
        let mut needed: u64 = 1; // right sibling of the leaf
        let mut page_id = leaf_id;
        loop {
            let node = pager.get_page(page_id)?;
            if node.page_id() == self.root_page_id {
                needed += 1; // relocated lower half of the pinned root
                break;
            }
            let parent_id = node.parent().ok_or(EngineError::CorruptedPage {
                page_id,
                reason: "non-root node has no parent pointer".to_string(),
            })?;
            let parent = pager.get_page(parent_id)?.as_internal()?;
            if !parent.is_full() {
                break;
            }
            needed += 1; // right sibling of the splitting parent
            page_id = parent_id;
        }
        if !pager.can_allocate(needed) {
            return Err(EngineError::CapacityExceeded {
                requested: pager.num_pages() + needed,
                max: crate::types::MAX_PAGES,
            });
        }
        Ok(needed)
    }

    /// Split a full leaf while inserting `cell` at `cell_index`. The
    /// lower half keeps the smaller count on an odd total; the promoted
    /// separator is the upper half's minimum key.
    fn split_leaf(
        &mut self,
        pager: &mut Pager,
        leaf_id: PageId,
        cell_index: usize,
        cell: LeafCell,
    ) -> Result<()> {
        let mut leaf = pager.get_page(leaf_id)?.as_leaf()?.clone();
        leaf.cells.insert(cell_index, cell);

        let left_count = leaf.cells.len() / 2;
        let upper_cells = leaf.cells.split_off(left_count);
        let separator = upper_cells[0].key;

        let right_id = pager.allocate_page()?;
        let mut right = LeafNode::new(right_id);
        right.next_leaf = leaf.next_leaf;
        right.cells = upper_cells;

        if leaf_id == self.root_page_id {
            // Pinned-root split: lower half moves to a fresh left page
            // and page 0 becomes an internal node over both halves.
            let left_id = pager.allocate_page()?;
            let left = LeafNode {
                page_id: left_id,
                parent: Some(self.root_page_id),
                next_leaf: Some(right_id),
                cells: leaf.cells,
            };
            right.parent = Some(self.root_page_id);
            let root = InternalNode {
                page_id: self.root_page_id,
                parent: None,
                right_child: right_id,
                cells: vec![InternalCell {
                    key: separator,
                    child: left_id,
                }],
            };
            pager.put_page(Node::Leaf(left));
            pager.put_page(Node::Leaf(right));
            pager.put_page(Node::Internal(root));
            return Ok(());
        }

        let parent_id = leaf.parent.ok_or(EngineError::CorruptedPage {
            page_id: leaf_id,
            reason: "non-root leaf has no parent pointer".to_string(),
        })?;
        leaf.next_leaf = Some(right_id);
        right.parent = Some(parent_id);
        pager.put_page(Node::Leaf(leaf));
        pager.put_page(Node::Leaf(right));
        self.insert_into_parent(pager, parent_id, leaf_id, separator, right_id)
    }

    /// Record a finished child split in `parent_id`: subtree `left_id`
    /// now holds keys < `separator` and `right_id` the rest.
    fn insert_into_parent(
        &mut self,
        pager: &mut Pager,
        parent_id: PageId,
        left_id: PageId,
        separator: RowId,
        right_id: PageId,
    ) -> Result<()> {
        let mut parent = pager.get_page(parent_id)?.as_internal()?.clone();

        if parent.right_child == left_id {
            parent.cells.push(InternalCell {
                key: separator,
                child: left_id,
            });
            parent.right_child = right_id;
        } else {
            let index = parent
                .cells
                .iter()
                .position(|cell| cell.child == left_id)
                .ok_or(EngineError::CorruptedPage {
                    page_id: parent_id,
                    reason: format!("no cell points at split child {left_id}"),
                })?;
            parent.cells.insert(
                index,
                InternalCell {
                    key: separator,
                    child: left_id,
                },
            );
            // The displaced cell keeps its separator but now bounds the
            // upper half of the split.
            parent.cells[index + 1].child = right_id;
        }

        if parent.cells.len() <= crate::types::INTERNAL_MAX_CELLS {
            pager.put_page(Node::Internal(parent));
            return Ok(());
        }
        log::debug!("splitting internal node {parent_id}");
        self.split_internal(pager, parent)
    }

    /// Split an overflowing internal node (its clone already holds one
    /// cell past capacity). The middle separator moves up; its child
    /// becomes the left node's rightmost child.
    fn split_internal(&mut self, pager: &mut Pager, mut node: InternalNode) -> Result<()> {
        let split_index = (node.cells.len() - 1) / 2;
        let mut upper_cells = node.cells.split_off(split_index);
        let promoted = upper_cells.remove(0);
        let separator = promoted.key;

        let right_id = pager.allocate_page()?;
        let mut right = InternalNode {
            page_id: right_id,
            parent: None, // set below
            right_child: node.right_child,
            cells: upper_cells,
        };
        node.right_child = promoted.child;

        if node.page_id == self.root_page_id {
            let left_id = pager.allocate_page()?;
            let left = InternalNode {
                page_id: left_id,
                parent: Some(self.root_page_id),
                right_child: node.right_child,
                cells: node.cells,
            };
            right.parent = Some(self.root_page_id);
            let root = InternalNode {
                page_id: self.root_page_id,
                parent: None,
                right_child: right_id,
                cells: vec![InternalCell {
                    key: separator,
                    child: left_id,
                }],
            };
            pager.put_page(Node::Internal(left));
            pager.put_page(Node::Internal(right));
            pager.put_page(Node::Internal(root));
            self.reparent_children(pager, left_id)?;
            self.reparent_children(pager, right_id)?;
            return Ok(());
        }

        let parent_id = node.parent.ok_or(EngineError::CorruptedPage {
            page_id: node.page_id,
            reason: "non-root internal node has no parent pointer".to_string(),
        })?;
        let left_id = node.page_id;
        right.parent = Some(parent_id);
        pager.put_page(Node::Internal(node));
        pager.put_page(Node::Internal(right));
        self.reparent_children(pager, right_id)?;
        self.insert_into_parent(pager, parent_id, left_id, separator, right_id)
    }

    /// Point every child of `page_id` back at it after cells moved.
    fn reparent_children(&self, pager: &mut Pager, page_id: PageId) -> Result<()> {
        let node = pager.get_page(page_id)?.as_internal()?;
        let mut children: Vec<PageId> = node.cells.iter().map(|cell| cell.child).collect();
        children.push(node.right_child);
        for child in children {
            pager.get_page_mut(child)?.set_parent(Some(page_id));
        }
        Ok(())
    }

    /// Largest key in the subtree rooted at `page_id`; `None` for an
    /// empty tree.
    pub fn max_key(&self, pager: &mut Pager, page_id: PageId) -> Result<Option<RowId>> {
        let mut current = page_id;
        loop {
            match pager.get_page(current)? {
                Node::Leaf(leaf) => return Ok(leaf.max_key()),
                Node::Internal(internal) => current = internal.right_child,
            }
        }
    }

    /// Distance from the root to the leaves. Every leaf sits at the same
    /// depth, so walking leftmost children measures the whole tree.
    pub fn height(&self, pager: &mut Pager) -> Result<usize> {
        let mut height = 0;
        let mut page_id = self.root_page_id;
        loop {
            match pager.get_page(page_id)? {
                Node::Leaf(_) => return Ok(height),
                Node::Internal(internal) => {
                    page_id = internal.leftmost_child();
                    height += 1;
                }
            }
        }
    }

    /// Human-readable tree dump for the REPL's `.btree` meta-command.
    pub fn render(&self, pager: &mut Pager) -> Result<String> {
        let mut out = String::new();
        self.render_node(pager, self.root_page_id, 0, &mut out)?;
        Ok(out)
    }

    fn render_node(
        &self,
        pager: &mut Pager,
        page_id: PageId,
        depth: usize,
        out: &mut String,
    ) -> Result<()> {
        let indent = "  ".repeat(depth);
        match pager.get_page(page_id)?.clone() {
            Node::Leaf(leaf) => {
                let _ = writeln!(out, "{indent}- leaf (page {page_id}, {} cells)", leaf.cells.len());
                for cell in &leaf.cells {
                    let _ = writeln!(out, "{indent}  - {}", cell.key);
                }
            }
            Node::Internal(internal) => {
                let _ = writeln!(
                    out,
                    "{indent}- internal (page {page_id}, {} keys)",
                    internal.cells.len()
                );
                for cell in &internal.cells {
                    self.render_node(pager, cell.child, depth + 1, out)?;
                    let _ = writeln!(out, "{indent}  - key {}", cell.key);
                }
                self.render_node(pager, internal.right_child, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

impl Default for BTree {
    fn default() -> Self {
        Self::new()
    }
}
