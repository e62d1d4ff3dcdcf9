use crate::types::{Article, FeedSpec, Result, TrackerError};
use crate::utils::{text::extract_text_from_html, url::extract_domain, url::is_http_url};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

/// Turns cached feed payloads into articles, skipping items already seen in
/// this run under the same GUID or link.
pub struct FeedParser {
    max_entries: usize,
    seen_guids: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl FeedParser {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            seen_guids: HashSet::new(),
            seen_urls: HashSet::new(),
        }
    }

    pub fn parse_feed(
        &mut self,
        feed: &FeedSpec,
        content: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        debug!("Parsing feed {} ({} bytes)", feed.id, content.len());

        let content = Self::normalize_encoding(content).map_err(|_| TrackerError::FeedParse {
            feed_id: feed.id.clone(),
            reason: "empty payload".to_string(),
        })?;
        if !Self::is_valid_feed_content(&content) {
            return Err(TrackerError::FeedParse {
                feed_id: feed.id.clone(),
                reason: "payload does not look like RSS or Atom".to_string(),
            });
        }

        let parsed = parser::parse(content.as_bytes()).map_err(|e| TrackerError::FeedParse {
            feed_id: feed.id.clone(),
            reason: e.to_string(),
        })?;

        let feed_title = feed
            .title
            .clone()
            .or_else(|| parsed.title.map(|t| t.content.trim().to_string()))
            .filter(|t| !t.is_empty());

        let mut articles = Vec::new();
        for entry in parsed.entries.into_iter().take(self.max_entries) {
            if let Some(article) =
                self.parse_entry(feed, feed_title.as_deref(), entry, fetched_at)
            {
                articles.push(article);
            }
        }

        info!("Parsed {} articles from {}", articles.len(), feed.display_name());
        Ok(articles)
    }

    fn parse_entry(
        &mut self,
        feed: &FeedSpec,
        feed_title: Option<&str>,
        entry: feed_rs::model::Entry,
        fetched_at: DateTime<Utc>,
    ) -> Option<Article> {
        let title = entry
            .title
            .map(|t| extract_text_from_html(&t.content))
            .unwrap_or_default();

        // Prefer the first link; some feeds only carry the permalink as the id
        let url = entry
            .links
            .first()
            .map(|link| link.href.trim().to_string())
            .or_else(|| is_http_url(&entry.id).then(|| entry.id.clone()))
            .unwrap_or_default();

        let guid = (!entry.id.is_empty()).then(|| entry.id.clone());

        if let Some(ref guid) = guid {
            if !self.seen_guids.insert(guid.clone()) {
                debug!("Skipping duplicate entry with GUID: {}", guid);
                return None;
            }
        }
        if !url.is_empty() && !self.seen_urls.insert(url.clone()) {
            debug!("Skipping duplicate entry with URL: {}", url);
            return None;
        }

        let body = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .map(|html| extract_text_from_html(&html))
            .unwrap_or_default();

        let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

        let source = feed_title
            .map(str::to_string)
            .or_else(|| extract_domain(&url))
            .unwrap_or_else(|| feed.id.clone());

        Some(Article {
            feed_id: feed.id.clone(),
            source,
            guid,
            title,
            body,
            published_at,
            url,
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_markers = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        has_feed_markers && content.trim_start().starts_with('<')
    }

    pub fn normalize_encoding(content: &str) -> Result<String> {
        let normalized = content
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .trim()
            .to_string();

        if normalized.is_empty() {
            return Err(TrackerError::General("Empty content after normalization".to_string()));
        }

        Ok(normalized)
    }

    pub fn seen_counts(&self) -> (usize, usize) {
        (self.seen_guids.len(), self.seen_urls.len())
    }
}
