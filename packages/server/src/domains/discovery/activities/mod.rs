pub mod discover;
pub mod start_search;

pub use discover::{
    checked_radius, discover, DiscoverRequest, DiscoveryError, PageDelay, PlaceStream,
    MAX_RADIUS_METERS,
};
pub use start_search::{start_search, SearchSummary, StartSearchRequest};
