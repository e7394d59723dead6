pub mod btree;
pub mod cursor;
pub mod pager;
pub mod table;
