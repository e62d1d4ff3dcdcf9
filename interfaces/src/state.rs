use std::collections::HashMap;

use anyhow::Result;

use crate::defs::FeedCache;

/// Feed cache held entirely in memory, keyed by feed id.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeedCache {
    feeds: HashMap<String, String>,
}

impl MemoryFeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, feed_id: impl Into<String>, content: impl Into<String>) {
        self.feeds.insert(feed_id.into(), content.into());
    }

    pub fn with_feed(mut self, feed_id: impl Into<String>, content: impl Into<String>) -> Self {
        self.ingest(feed_id, content);
        self
    }
}

impl FeedCache for MemoryFeedCache {
    fn load(&self, feed_id: &str) -> Result<Option<String>> {
        Ok(self.feeds.get(feed_id).cloned())
    }

    fn cached_feed_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.feeds.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
