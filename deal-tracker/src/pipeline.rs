use crate::aggregator::{aggregate, AggregateReport};
use crate::alerts;
use crate::classifier::DealClassifier;
use crate::config::TrackerConfig;
use crate::extractor::DealExtractor;
use crate::filter::{DealFilter, Deduplicator};
use crate::parser::FeedParser;
use crate::taxonomy::Taxonomy;
use crate::types::{
    Article, ClassifiedDeal, DealSet, FeedCache, FeedSpec, FinalDeal, Result, RunWarning,
    TrackerError, WarningKind,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub feeds_expected: usize,
    pub feeds_read: usize,
    pub articles: usize,
    pub candidates: usize,
    pub below_min_confidence: usize,
    pub after_filter: usize,
    pub final_deals: usize,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub deal_set: DealSet,
    pub report: AggregateReport,
    pub warnings: Vec<RunWarning>,
    pub stats: RunStats,
}

/// cache -> parse -> extract -> classify -> filter/dedupe -> alerts -> aggregate
pub struct TrackerPipeline {
    config: TrackerConfig,
    cache: Box<dyn FeedCache>,
    extractor: DealExtractor,
    classifier: DealClassifier,
}

impl TrackerPipeline {
    /// Validates the configuration before anything else is built, so an
    /// invalid setup never reaches the cache.
    pub fn new(config: TrackerConfig, cache: Box<dyn FeedCache>) -> Result<Self> {
        config.validate()?;

        let taxonomy = Arc::new(Taxonomy::from_config(&config));
        let extractor = DealExtractor::new(&config, taxonomy.clone())?;
        let classifier = DealClassifier::new(taxonomy);

        Ok(Self {
            config,
            cache,
            extractor,
            classifier,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn run(&self, now: DateTime<Utc>) -> Result<RunOutput> {
        let mut warnings = Vec::new();
        let mut stats = RunStats::default();

        let feeds = self.expected_feeds()?;
        stats.feeds_expected = feeds.len();
        info!("Processing {} feeds", feeds.len());

        // Every cache read completes before deduplication starts
        let articles = self.read_articles(&feeds, now, &mut warnings, &mut stats);
        stats.articles = articles.len();

        let classified = self.extract_and_classify(&articles, &mut warnings, &mut stats);

        let filtered = DealFilter::new(&self.config.deal_filters, now).apply(classified);
        stats.after_filter = filtered.len();

        let survivors = Deduplicator::new(self.config.deal_filters.dedup_tolerance_days)
            .deduplicate(filtered);

        let mut deal_set = DealSet::new(
            survivors
                .into_iter()
                .map(|deal| {
                    let label = self.config.value_ranges.label_for(deal.candidate.value_millions);
                    FinalDeal::new(deal, label)
                })
                .collect(),
        );
        alerts::apply(&self.config.alerts, &mut deal_set);
        stats.final_deals = deal_set.len();

        let report = aggregate(&deal_set, &self.config.value_ranges);

        info!(
            "Run complete: {} articles, {} candidates, {} deals, {} warnings",
            stats.articles,
            stats.candidates,
            stats.final_deals,
            warnings.len()
        );

        Ok(RunOutput {
            deal_set,
            report,
            warnings,
            stats,
        })
    }

    /// Configured feeds, or everything in the cache when none are configured.
    fn expected_feeds(&self) -> Result<Vec<FeedSpec>> {
        if !self.config.feeds.is_empty() {
            return Ok(self.config.feeds.clone());
        }

        let ids = self.cache.cached_feed_ids().map_err(TrackerError::Cache)?;
        Ok(ids.into_iter().map(FeedSpec::new).collect())
    }

    fn read_articles(
        &self,
        feeds: &[FeedSpec],
        now: DateTime<Utc>,
        warnings: &mut Vec<RunWarning>,
        stats: &mut RunStats,
    ) -> Vec<Article> {
        let mut parser = FeedParser::new(self.config.deal_filters.max_entries_per_feed);
        let mut articles = Vec::new();

        for feed in feeds {
            let content = match self.cache.load(&feed.id) {
                Ok(Some(content)) => content,
                Ok(None) => {
                    let error = TrackerError::FeedUnavailable {
                        feed_id: feed.id.clone(),
                    };
                    warn!("Skipping {}: {}", feed.display_name(), error);
                    warnings.push(RunWarning::new(WarningKind::FeedUnavailable, &feed.id, &error));
                    continue;
                }
                Err(e) => {
                    let error = TrackerError::Cache(e);
                    warn!("Skipping {}: {}", feed.display_name(), error);
                    warnings.push(RunWarning::new(WarningKind::FeedUnavailable, &feed.id, &error));
                    continue;
                }
            };

            match parser.parse_feed(feed, &content, now) {
                Ok(parsed) => {
                    stats.feeds_read += 1;
                    articles.extend(parsed);
                }
                Err(error) => {
                    warn!("Skipping {}: {}", feed.display_name(), error);
                    warnings.push(RunWarning::new(WarningKind::FeedUnreadable, &feed.id, &error));
                }
            }
        }

        articles
    }

    fn extract_and_classify(
        &self,
        articles: &[Article],
        warnings: &mut Vec<RunWarning>,
        stats: &mut RunStats,
    ) -> Vec<ClassifiedDeal> {
        let min_confidence = self.config.extraction.min_confidence;
        let mut classified = Vec::new();

        for article in articles {
            let extraction = match self.extractor.extract(article) {
                Ok(extraction) => extraction,
                Err(error) => {
                    warn!("Article failed ({}): {}", article.url, error);
                    warnings.push(RunWarning::new(
                        WarningKind::ArticleFailed,
                        &article.feed_id,
                        &error,
                    ));
                    continue;
                }
            };

            for issue in &extraction.issues {
                match issue {
                    TrackerError::ExtractionIncomplete { .. } => {
                        warnings.push(RunWarning::new(
                            WarningKind::ManualReview,
                            &article.feed_id,
                            issue,
                        ));
                    }
                    other => debug!("Recovered: {}", other),
                }
            }

            let Some(candidate) = extraction.candidate else {
                continue;
            };
            stats.candidates += 1;

            if candidate.confidence < min_confidence {
                debug!(
                    "Dropping {} below minimum confidence ({:.2} < {:.2})",
                    candidate.target, candidate.confidence, min_confidence
                );
                stats.below_min_confidence += 1;
                continue;
            }

            classified.push(self.classifier.classify(candidate, &article.text()));
        }

        classified
    }
}
