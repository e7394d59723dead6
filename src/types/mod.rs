pub mod error;
pub mod node;
pub mod row;

// Common type aliases
pub type PageId = u64;
pub type RowId = u64;

/// Size of one page, the unit of file I/O.
pub const PAGE_SIZE: usize = 4096;

/// Hard ceiling on the number of pages a single database file may hold.
pub const MAX_PAGES: u64 = 1024;

/// Per-page header: type tag, parent pointer, sibling/right-child pointer,
/// cell count, reserved byte, CRC32.
pub const PAGE_HEADER_SIZE: usize = 24;

pub const CHECKSUM_SIZE: usize = 4; // CRC32 over the rest of the page
pub const CHECKSUM_OFFSET: usize = PAGE_HEADER_SIZE - CHECKSUM_SIZE;

/// Sentinel encoding of an absent page id in page headers.
pub const NO_PAGE: PageId = u64::MAX;

// Fixed row schema: integer key plus two bounded text fields.
pub const ID_SIZE: usize = 8;
pub const USERNAME_MAX_LEN: usize = 32;
pub const EMAIL_MAX_LEN: usize = 255;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_MAX_LEN + EMAIL_MAX_LEN;

// Leaf cells are whole serialized rows; the key is the first 8 bytes of
// the payload, so no separate key copy is stored.
pub const LEAF_CELL_SIZE: usize = ROW_SIZE;
pub const LEAF_MAX_CELLS: usize = (PAGE_SIZE - PAGE_HEADER_SIZE) / LEAF_CELL_SIZE;

// Internal cells pair a separator key with a child page id.
pub const INTERNAL_CELL_SIZE: usize = 16;
pub const INTERNAL_MAX_CELLS: usize = (PAGE_SIZE - PAGE_HEADER_SIZE) / INTERNAL_CELL_SIZE;
