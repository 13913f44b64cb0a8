//! Extraction domain - turns an enrichment bundle into structured lead
//! fields with a language model.
//!
//! ```text
//! ExtractionRequest ─► BaseAI::complete ─► RawCompletion ─► ExtractionResult ─► patches
//! ```

pub mod prompt;
pub mod response;
pub mod stage;

pub use prompt::{ExtractionRequest, INSTRUCTIONS, SYSTEM_PROMPT};
pub use response::{clean_response, normalize_date, ExtractionResult, RawCompletion, SocialChannels};
pub use stage::{ExtractionStage, DEFAULT_INFERENCE_TIMEOUT};
