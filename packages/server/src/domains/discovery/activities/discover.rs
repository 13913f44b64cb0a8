//! Paginated directory discovery with a resumable cursor.
//!
//! Pages are streamed: each place is yielded as soon as its page arrives, and
//! the cursor is saved after every page, before the next one is requested. A
//! later run for the same (query, location, radius) picks up from the saved
//! continuation token and keeps counting from the saved totals.

use async_stream::stream;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::domains::discovery::cursor_store::CursorStore;
use crate::domains::discovery::models::{CursorKey, PaginationCursor};
use crate::kernel::{BaseDirectory, PlaceResult};

const STATUS_OK: &str = "OK";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("radius must be between 1 and {max} meters, got {0}", max = MAX_RADIUS_METERS)]
    InvalidRadius(u32),

    #[error("no geocoding match for {0}")]
    GeocodeNotFound(String),

    #[error("directory returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("directory request failed: {0:#}")]
    Directory(anyhow::Error),

    #[error("cursor store failed: {0:#}")]
    Cursor(anyhow::Error),

    #[error("lead store failed: {0:#}")]
    Store(anyhow::Error),
}

/// Largest radius the directory's text search accepts.
pub const MAX_RADIUS_METERS: u32 = 50_000;

/// Radius as stored on cursors and leads, or `InvalidRadius` when out of range.
pub fn checked_radius(radius_meters: u32) -> Result<i32, DiscoveryError> {
    if (1..=MAX_RADIUS_METERS).contains(&radius_meters) {
        i32::try_from(radius_meters).map_err(|_| DiscoveryError::InvalidRadius(radius_meters))
    } else {
        Err(DiscoveryError::InvalidRadius(radius_meters))
    }
}

/// Randomized pause between pages: `base` plus up to half of `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    pub base: Duration,
}

impl PageDelay {
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            base: Duration::from_millis(millis),
        }
    }

    pub fn none() -> Self {
        Self::from_millis(0)
    }

    pub fn next(&self) -> Duration {
        let base = self.base.as_millis() as u64;
        if base == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(base + fastrand::u64(0..=base / 2))
    }
}

impl Default for PageDelay {
    fn default() -> Self {
        Self::from_millis(2_000)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct DiscoverRequest {
    /// Free-text directory query (the search category).
    pub query: String,
    /// Location key, resolved through geocoding.
    pub location: String,
    #[builder(default = "br".to_string())]
    pub country: String,
    pub radius_meters: u32,
    #[builder(default = 3)]
    pub max_pages: u32,
    #[builder(default = 20)]
    pub max_results: usize,
    #[builder(default)]
    pub page_delay: PageDelay,
}

impl DiscoverRequest {
    pub fn cursor_key(&self) -> Result<CursorKey, DiscoveryError> {
        let radius = checked_radius(self.radius_meters)?;
        Ok(CursorKey::new(&self.query, &self.location, radius))
    }
}

pub type PlaceStream<'a> = Pin<Box<dyn Stream<Item = Result<PlaceResult, DiscoveryError>> + Send + 'a>>;

/// Stream places for a request. Stops on exhausted results, a missing
/// continuation token, `max_pages` or `max_results`, whichever comes first.
pub fn discover<'a>(
    request: DiscoverRequest,
    directory: &'a dyn BaseDirectory,
    cursors: &'a dyn CursorStore,
) -> PlaceStream<'a> {
    Box::pin(stream! {
        let key = match request.cursor_key() {
            Ok(key) => key,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let center = match directory.geocode(&request.location, &request.country).await {
            Ok(Some(center)) => center,
            Ok(None) => {
                yield Err(DiscoveryError::GeocodeNotFound(request.location.clone()));
                return;
            }
            Err(e) => {
                yield Err(DiscoveryError::Directory(e));
                return;
            }
        };

        let mut cursor = match cursors.load(&key).await {
            Ok(saved) => saved.unwrap_or_else(|| PaginationCursor::start(&key)),
            Err(e) => {
                yield Err(DiscoveryError::Cursor(e));
                return;
            }
        };

        if let Some(token) = &cursor.next_page_token {
            info!(
                query = %key.query,
                location = %key.location,
                pages_fetched = cursor.pages_fetched,
                leads_extracted = cursor.leads_extracted,
                token_preview = %token.chars().take(12).collect::<String>(),
                "Resuming discovery from saved cursor"
            );
        }

        let mut page_token = cursor.next_page_token.clone();
        let mut pages = 0u32;
        let mut emitted = 0usize;

        loop {
            let page = match directory
                .text_search(&request.query, center, request.radius_meters, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    yield Err(DiscoveryError::Directory(e));
                    return;
                }
            };

            if page.status == places_client::ZERO_RESULTS {
                info!(query = %request.query, "Directory has no more results");
                break;
            }
            if page.status != STATUS_OK {
                yield Err(DiscoveryError::Status {
                    status: page.status.clone(),
                    message: page.error_message.clone().unwrap_or_default(),
                });
                return;
            }

            let mut on_page = 0usize;
            for place in page.results {
                if emitted >= request.max_results {
                    break;
                }
                emitted += 1;
                on_page += 1;
                yield Ok(place);
            }

            pages += 1;
            cursor.advance(page.next_page_token, on_page);
            if let Err(e) = cursors.save(&cursor).await {
                yield Err(DiscoveryError::Cursor(e));
                return;
            }
            debug!(
                pages_fetched = cursor.pages_fetched,
                leads_extracted = cursor.leads_extracted,
                "Cursor saved"
            );

            page_token = cursor.next_page_token.clone();
            if page_token.is_none() || pages >= request.max_pages || emitted >= request.max_results {
                break;
            }

            tokio::time::sleep(request.page_delay.next()).await;
        }

        info!(query = %request.query, pages, emitted, "Discovery finished");
    })
}
