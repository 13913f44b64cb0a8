pub mod pagination_cursor;

pub use pagination_cursor::*;
