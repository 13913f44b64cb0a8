// HTTP routes
pub mod health;
pub mod leads;
pub mod search;

pub use health::*;
pub use leads::*;
pub use search::*;
