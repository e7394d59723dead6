use crate::types::{
    CHECKSUM_OFFSET, INTERNAL_CELL_SIZE, INTERNAL_MAX_CELLS, LEAF_CELL_SIZE,
    LEAF_MAX_CELLS, NO_PAGE, PAGE_HEADER_SIZE, PAGE_SIZE, PageId, ROW_SIZE, RowId,
    error::{EngineError, Result},
    row::Row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 5,
    Leaf = 13,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            5 => Ok(NodeType::Internal),
            13 => Ok(NodeType::Leaf),
            _ => Err(EngineError::InvalidNodeType(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/*
 * Page layout on disk (fixed-size cells)
 * ┌────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (24 bytes)                      │
 * │  node_type(1) | parent(8) | next_leaf/right_child(8) |         │
 * │  cell_count(2) | reserved(1) | crc32(4)                        │
 * ├────────────────────────────────────────────────────────────────┤
 * │                    CELL ARRAY (key-ordered)                    │
 * │  leaf cell     = serialized row (key = first 8 bytes)          │
 * │  internal cell = key(8) | child page id(8)                     │
 * ├────────────────────────────────────────────────────────────────┤
 * │                    UNUSED (zeroed)                             │
 * └────────────────────────────────────────────────────────────────┘
 *
 * Page ids are zero-based; u64::MAX marks an absent pointer. The CRC32
 * covers the whole page with its own field zeroed.
 */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCell {
    pub key: RowId,
    pub payload: [u8; ROW_SIZE],
}

impl LeafCell {
    pub fn new(payload: [u8; ROW_SIZE]) -> Self {
        Self {
            key: Row::key_of(&payload),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalCell {
    pub key: RowId,
    pub child: PageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub page_id: PageId,
    pub parent: Option<PageId>,
    pub next_leaf: Option<PageId>,
    pub cells: Vec<LeafCell>,
}

impl LeafNode {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            parent: None,
            next_leaf: None,
            cells: Vec::new(),
        }
    }

    /// Index of the first cell whose key is >= `key`: the position of an
    /// exact match, or the insertion point that keeps cells ordered.
    pub fn find_cell(&self, key: RowId) -> usize {
        self.cells.partition_point(|cell| cell.key < key)
    }

    pub fn max_key(&self) -> Option<RowId> {
        self.cells.last().map(|cell| cell.key)
    }

    pub fn is_full(&self) -> bool {
        self.cells.len() >= LEAF_MAX_CELLS
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub page_id: PageId,
    pub parent: Option<PageId>,
    /// Child for all keys >= the last separator.
    pub right_child: PageId,
    pub cells: Vec<InternalCell>,
}

impl InternalNode {
    /// Child whose key range contains `key`. A cell `(k, c)` routes every
    /// key < k into `c`; keys beyond the last separator go right.
    pub fn find_child(&self, key: RowId) -> PageId {
        let index = self.cells.partition_point(|cell| cell.key <= key);
        match self.cells.get(index) {
            Some(cell) => cell.child,
            None => self.right_child,
        }
    }

    pub fn leftmost_child(&self) -> PageId {
        match self.cells.first() {
            Some(cell) => cell.child,
            None => self.right_child,
        }
    }

    pub fn is_full(&self) -> bool {
        self.cells.len() >= INTERNAL_MAX_CELLS
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl Node {
    pub fn page_id(&self) -> PageId {
        match self {
            Node::Leaf(leaf) => leaf.page_id,
            Node::Internal(internal) => internal.page_id,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Leaf(_) => NodeType::Leaf,
            Node::Internal(_) => NodeType::Internal,
        }
    }

    pub fn parent(&self) -> Option<PageId> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Internal(internal) => internal.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<PageId>) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Internal(internal) => internal.parent = parent,
        }
    }

    pub fn cell_count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.cells.len(),
            Node::Internal(internal) => internal.cells.len(),
        }
    }

    pub fn as_leaf(&self) -> Result<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(internal) => Err(EngineError::CorruptedPage {
                page_id: internal.page_id,
                reason: "expected a leaf node".to_string(),
            }),
        }
    }

    pub fn as_leaf_mut(&mut self) -> Result<&mut LeafNode> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(internal) => Err(EngineError::CorruptedPage {
                page_id: internal.page_id,
                reason: "expected a leaf node".to_string(),
            }),
        }
    }

    pub fn as_internal(&self) -> Result<&InternalNode> {
        match self {
            Node::Internal(internal) => Ok(internal),
            Node::Leaf(leaf) => Err(EngineError::CorruptedPage {
                page_id: leaf.page_id,
                reason: "expected an internal node".to_string(),
            }),
        }
    }

    /// Serialize the node following the documented layout, checksum last.
    pub fn to_bytes(&self) -> [u8; PAGE_SIZE] {
        let mut buffer = [0u8; PAGE_SIZE];
        buffer[0] = self.node_type().as_u8();
        buffer[1..9].copy_from_slice(&self.parent().unwrap_or(NO_PAGE).to_le_bytes());

        match self {
            Node::Leaf(leaf) => {
                buffer[9..17].copy_from_slice(&leaf.next_leaf.unwrap_or(NO_PAGE).to_le_bytes());
                buffer[17..19].copy_from_slice(&(leaf.cells.len() as u16).to_le_bytes());
                let mut offset = PAGE_HEADER_SIZE;
                for cell in &leaf.cells {
                    buffer[offset..offset + LEAF_CELL_SIZE].copy_from_slice(&cell.payload);
                    offset += LEAF_CELL_SIZE;
                }
            }
            Node::Internal(internal) => {
                buffer[9..17].copy_from_slice(&internal.right_child.to_le_bytes());
                buffer[17..19].copy_from_slice(&(internal.cells.len() as u16).to_le_bytes());
                let mut offset = PAGE_HEADER_SIZE;
                for cell in &internal.cells {
                    buffer[offset..offset + 8].copy_from_slice(&cell.key.to_le_bytes());
                    buffer[offset + 8..offset + 16].copy_from_slice(&cell.child.to_le_bytes());
                    offset += INTERNAL_CELL_SIZE;
                }
            }
        }

        let checksum = page_checksum(&buffer);
        buffer[CHECKSUM_OFFSET..PAGE_HEADER_SIZE].copy_from_slice(&checksum.to_le_bytes());
        buffer
    }

    /// Deserialize and validate a page. Any layout violation (bad tag,
    /// checksum mismatch, oversized cell count, unsorted keys) surfaces
    /// as a corruption error since traversal past it is undefined.
    pub fn from_bytes(page_id: PageId, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(EngineError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }

        let node_type = NodeType::from_u8(bytes[0])?;

        let stored = u32::from_le_bytes(
            bytes[CHECKSUM_OFFSET..PAGE_HEADER_SIZE].try_into().unwrap(),
        );
        let mut zeroed: [u8; PAGE_SIZE] = bytes.try_into().unwrap();
        zeroed[CHECKSUM_OFFSET..PAGE_HEADER_SIZE].fill(0);
        let computed = page_checksum(&zeroed);
        if stored != computed {
            return Err(EngineError::CorruptedPage {
                page_id,
                reason: format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
            });
        }
        let parent_raw = u64::from_le_bytes(bytes[1..9].try_into().unwrap());
        let parent = (parent_raw != NO_PAGE).then_some(parent_raw);
        let sibling_raw = u64::from_le_bytes(bytes[9..17].try_into().unwrap());
        let cell_count = u16::from_le_bytes(bytes[17..19].try_into().unwrap()) as usize;

        let node = match node_type {
            NodeType::Leaf => {
                if cell_count > LEAF_MAX_CELLS {
                    return Err(EngineError::CorruptedPage {
                        page_id,
                        reason: format!("leaf cell count {cell_count} exceeds capacity {LEAF_MAX_CELLS}"),
                    });
                }
                let mut cells = Vec::with_capacity(cell_count);
                let mut offset = PAGE_HEADER_SIZE;
                for _ in 0..cell_count {
                    let payload: [u8; ROW_SIZE] =
                        bytes[offset..offset + LEAF_CELL_SIZE].try_into().unwrap();
                    cells.push(LeafCell::new(payload));
                    offset += LEAF_CELL_SIZE;
                }
                Node::Leaf(LeafNode {
                    page_id,
                    parent,
                    next_leaf: (sibling_raw != NO_PAGE).then_some(sibling_raw),
                    cells,
                })
            }
            NodeType::Internal => {
                if cell_count > INTERNAL_MAX_CELLS {
                    return Err(EngineError::CorruptedPage {
                        page_id,
                        reason: format!(
                            "internal cell count {cell_count} exceeds capacity {INTERNAL_MAX_CELLS}"
                        ),
                    });
                }
                if sibling_raw == NO_PAGE {
                    return Err(EngineError::CorruptedPage {
                        page_id,
                        reason: "internal node has no rightmost child".to_string(),
                    });
                }
                let mut cells = Vec::with_capacity(cell_count);
                let mut offset = PAGE_HEADER_SIZE;
                for _ in 0..cell_count {
                    let key = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
                    let child =
                        u64::from_le_bytes(bytes[offset + 8..offset + 16].try_into().unwrap());
                    cells.push(InternalCell { key, child });
                    offset += INTERNAL_CELL_SIZE;
                }
                Node::Internal(InternalNode {
                    page_id,
                    parent,
                    right_child: sibling_raw,
                    cells,
                })
            }
        };

        node.check_key_order()?;
        Ok(node)
    }

    fn check_key_order(&self) -> Result<()> {
        let sorted = match self {
            Node::Leaf(leaf) => leaf.cells.windows(2).all(|w| w[0].key < w[1].key),
            Node::Internal(internal) => {
                internal.cells.windows(2).all(|w| w[0].key < w[1].key)
            }
        };
        if sorted {
            Ok(())
        } else {
            Err(EngineError::CorruptedPage {
                page_id: self.page_id(),
                reason: "cell keys are not strictly increasing".to_string(),
            })
        }
    }
}

fn page_checksum(buffer: &[u8; PAGE_SIZE]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(buffer);
    hasher.finalize()
}
