//! Leads domain - canonical business records, idempotent upsert and
//! single-field patches.

pub mod activities;
pub mod models;
pub mod patch;
pub mod store;

pub use activities::{record_lead, save_leads, RecordError, SaveLeadsSummary};
pub use models::{Lead, NewLead};
pub use patch::{FieldKind, FieldValue, LeadField, PatchError};
pub use store::{InMemoryLeadStore, LeadStore, PgLeadStore, StoreError, StoreLeadPatcher};
