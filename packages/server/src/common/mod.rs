// Types shared across stages

pub mod messages;

pub use messages::*;
