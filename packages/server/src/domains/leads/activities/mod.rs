pub mod save_leads;

pub use save_leads::{record_lead, save_leads, RecordError, SaveLeadsSummary};
