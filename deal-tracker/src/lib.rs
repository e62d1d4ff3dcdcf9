pub mod aggregator;
pub mod alerts;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod extractor;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod taxonomy;
pub mod types;
pub mod utils;

pub use types::*;
pub use aggregator::{aggregate, AggregateReport};
pub use cache::DirectoryFeedCache;
pub use classifier::DealClassifier;
pub use config::{ConfigOverrides, ReportFormat, TrackerConfig};
pub use extractor::DealExtractor;
pub use filter::{DealFilter, Deduplicator};
pub use parser::FeedParser;
pub use pipeline::{RunOutput, RunStats, TrackerPipeline};
pub use taxonomy::Taxonomy;
