//! Discovery domain - paginated directory search with resumable cursors

pub mod activities;
pub mod cursor_store;
pub mod models;

pub use activities::{
    discover, start_search, DiscoverRequest, DiscoveryError, PageDelay, SearchSummary,
    StartSearchRequest,
};
pub use cursor_store::{CursorStore, InMemoryCursorStore, PgCursorStore};
pub use models::{CursorKey, PaginationCursor};
