pub mod defs;
pub mod empty;
pub mod state;

pub use defs::{FeedCache, FeedSpec, ReportWriter, Sheet, Workbook};
pub use empty::EmptyFeedCache;
pub use state::MemoryFeedCache;
