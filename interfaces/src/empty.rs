use anyhow::Result;

use crate::defs::FeedCache;

pub struct EmptyFeedCache;

impl FeedCache for EmptyFeedCache {
    fn load(&self, _feed_id: &str) -> Result<Option<String>> {
        // Nothing was ever fetched.
        Ok(None)
    }

    fn cached_feed_ids(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
