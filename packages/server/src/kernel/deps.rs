//! Server dependencies for the API and search jobs (using traits for testability)

use std::sync::Arc;

use crate::domains::discovery::{CursorStore, PageDelay};
use crate::domains::leads::LeadStore;
use crate::kernel::nats::BroadcastBus;
use crate::kernel::BaseDirectory;

/// Dependencies shared by request handlers
#[derive(Clone)]
pub struct ServerDeps {
    pub lead_store: Arc<dyn LeadStore>,
    pub cursor_store: Arc<dyn CursorStore>,
    pub directory: Arc<dyn BaseDirectory>,
    /// Owned broker connection; `leads` is declared at startup.
    pub bus: Arc<dyn BroadcastBus>,
    /// Pause between directory pages.
    pub page_delay: PageDelay,
}
