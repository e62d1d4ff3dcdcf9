mod common;

use common::{days_ago, deal, init_tracing, rss_feed, run_time};
use deal_tracker::config::{ConfigOverrides, MAX_DAYS};
use deal_tracker::report::{self, build_workbook, CsvReportWriter, JsonReportWriter};
use deal_tracker::{
    DealFilter, FeedCache, FeedParser, FeedSpec, Priority, ReportFormat, ReportWriter,
    TrackerConfig, TrackerError, TrackerPipeline, WarningKind,
};
use interfaces::{EmptyFeedCache, MemoryFeedCache};
use std::fs;
use tempfile::TempDir;
use tracing::info;

fn wire_feed() -> String {
    rss_feed(
        "Deal Wire",
        &[
            (
                "Accenture acquires Cloud Consulting Ltd for £25 million",
                "The London consultancy adds cloud consulting capability.",
                "https://dealwire.example.com/accenture-cloud-consulting",
                "Wed, 12 Mar 2025 09:00:00 GMT",
            ),
            (
                "Accenture buys Cloud Consulting Ltd",
                "Accenture has bought the cloud consulting firm for an undisclosed sum.",
                "https://dealwire.example.com/accenture-buys",
                "Thu, 13 Mar 2025 10:00:00 GMT",
            ),
            (
                "Quarterly market update",
                "Share prices rose.",
                "https://dealwire.example.com/market-update",
                "Thu, 13 Mar 2025 11:00:00 GMT",
            ),
        ],
    )
}

fn config_with_feeds(ids: &[&str]) -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.feeds = ids.iter().map(|id| FeedSpec::new(*id)).collect();
    config
}

#[test]
fn test_pipeline_end_to_end() {
    init_tracing();
    let cache = MemoryFeedCache::new().with_feed("wire", wire_feed());
    let config = config_with_feeds(&["wire", "missing"]);
    let pipeline = TrackerPipeline::new(config, Box::new(cache)).unwrap();

    let output = pipeline.run(run_time()).unwrap();

    assert_eq!(output.stats.feeds_expected, 2);
    assert_eq!(output.stats.feeds_read, 1);
    assert_eq!(output.stats.articles, 3);
    assert_eq!(output.stats.candidates, 2);
    assert_eq!(output.deal_set.len(), 1);

    let deal = &output.deal_set.deals[0];
    let candidate = deal.candidate();
    assert_eq!(candidate.buyer.as_deref(), Some("Accenture"));
    assert_eq!(candidate.target, "Cloud Consulting Ltd");
    assert_eq!(candidate.value_millions, Some(25.0));
    assert_eq!(candidate.source, "Deal Wire");
    assert_eq!(deal.deal.geography, "UK");
    assert_eq!(deal.value_range, "£10-25m");
    assert_eq!(deal.priority, Priority::Low);

    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].kind, WarningKind::FeedUnavailable);
    assert_eq!(output.warnings[0].feed_id, "missing");

    assert_eq!(output.report.total_deals, 1);
    info!("Run stats: {:?}", output.stats);
}

#[test]
fn test_invalid_config_aborts_before_reading_feeds() {
    init_tracing();

    struct UntouchableCache;
    impl FeedCache for UntouchableCache {
        fn load(&self, _feed_id: &str) -> anyhow::Result<Option<String>> {
            panic!("cache read before validation");
        }
        fn cached_feed_ids(&self) -> anyhow::Result<Vec<String>> {
            panic!("cache read before validation");
        }
    }

    let mut config = config_with_feeds(&["wire"]);
    config.deal_filters.turnover_range_millions.min = 60.0;

    match TrackerPipeline::new(config, Box::new(UntouchableCache)) {
        Err(TrackerError::ConfigInvalid { field, .. }) => {
            assert_eq!(field, "deal_filters.turnover_range_millions")
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("inverted range accepted"),
    }
}

#[test]
fn test_unreadable_feed_does_not_stop_the_run() {
    init_tracing();
    let cache = MemoryFeedCache::new()
        .with_feed("broken", "this is not xml at all")
        .with_feed("wire", wire_feed());
    let config = config_with_feeds(&["broken", "wire"]);
    let pipeline = TrackerPipeline::new(config, Box::new(cache)).unwrap();

    let output = pipeline.run(run_time()).unwrap();

    assert_eq!(output.deal_set.len(), 1);
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].kind, WarningKind::FeedUnreadable);
}

#[test]
fn test_cached_feeds_used_when_none_configured() {
    init_tracing();
    let cache = MemoryFeedCache::new().with_feed("wire", wire_feed());
    let pipeline = TrackerPipeline::new(TrackerConfig::default(), Box::new(cache)).unwrap();

    let output = pipeline.run(run_time()).unwrap();
    assert_eq!(output.stats.feeds_expected, 1);
    assert_eq!(output.deal_set.len(), 1);
    assert!(output.warnings.is_empty());

    let empty = TrackerPipeline::new(TrackerConfig::default(), Box::new(EmptyFeedCache)).unwrap();
    let output = empty.run(run_time()).unwrap();
    assert!(output.deal_set.is_empty());
    assert_eq!(output.report.total_deals, 0);
}

#[test]
fn test_lookback_and_disclosed_only_overrides() {
    init_tracing();
    let cache = MemoryFeedCache::new().with_feed("wire", wire_feed());
    let mut config = config_with_feeds(&["wire"]);
    config.apply_overrides(&ConfigOverrides {
        days_lookback: Some(2),
        disclosed_only: true,
        ..ConfigOverrides::default()
    });
    let pipeline = TrackerPipeline::new(config, Box::new(cache)).unwrap();

    // The disclosed report is two days old, the recent one has no value
    let output = pipeline.run(run_time()).unwrap();
    assert!(output.deal_set.is_empty());
}

#[test]
fn test_parser_limits_and_cleans_entries() {
    init_tracing();
    let feed = FeedSpec::new("wire");

    let mut parser = FeedParser::new(1);
    let articles = parser.parse_feed(&feed, &wire_feed(), run_time()).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(parser.seen_counts(), (1, 1));

    // A configured title names the source ahead of the channel title
    let titled = FeedSpec::new("wire").with_title("Configured Wire");
    let articles = FeedParser::new(20).parse_feed(&titled, &wire_feed(), run_time()).unwrap();
    assert!(articles.iter().all(|a| a.source == "Configured Wire"));

    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>HTML Wire</title>
<item>
<title>Alpha acquires Beta</title>
<description><![CDATA[<p>Deal <b>closed</b></p>]]></description>
<link>https://html.example.com/alpha-beta</link>
</item>
<item>
<title>Alpha acquires Beta</title>
<description>Same story again</description>
<link>https://html.example.com/alpha-beta</link>
</item>
</channel></rss>"#;
    let mut parser = FeedParser::new(20);
    let articles = parser.parse_feed(&feed, xml, run_time()).unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].body, "Deal closed");
    assert_eq!(articles[0].published_at, run_time());
    assert_eq!(articles[0].source, "HTML Wire");

    assert!(parser.parse_feed(&feed, "   ", run_time()).is_err());
}

#[test]
fn test_config_json_and_validation() {
    let config = TrackerConfig::from_json(
        r#"{
            "deal_filters": { "turnover_range_millions": { "min": 1, "max": 100 }, "days_lookback": 30 },
            "custom_sectors": { "Fintech": ["payments"] },
            "output": { "format": "json" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.deal_filters.days_lookback, 30);
    assert!(config.deal_filters.include_undisclosed);
    assert_eq!(config.output.format, ReportFormat::Json);
    assert_eq!(config.sector_taxonomy().keys().last().map(|k| k.as_str()), Some("Fintech"));
    assert!(config.validate().is_ok());

    assert!(matches!(
        TrackerConfig::from_json("{ not json"),
        Err(TrackerError::ConfigInvalid { .. })
    ));

    let mut bad = TrackerConfig::default();
    bad.extraction.min_confidence = 1.5;
    assert!(matches!(
        bad.validate(),
        Err(TrackerError::ConfigInvalid { field, .. }) if field == "extraction.min_confidence"
    ));

    let mut bad = TrackerConfig::default();
    bad.alerts.roll_up_threshold = 1;
    assert!(bad.validate().is_err());

    let bad = config_with_feeds(&["wire", "wire"]);
    assert!(bad.validate().is_err());
}

#[test]
fn test_oversized_day_windows_rejected() {
    init_tracing();
    let mut config = TrackerConfig::default();
    config.apply_overrides(&ConfigOverrides {
        days_lookback: Some(200_000_000),
        ..ConfigOverrides::default()
    });

    match TrackerPipeline::new(config.clone(), Box::new(EmptyFeedCache)) {
        Err(TrackerError::ConfigInvalid { field, .. }) => {
            assert_eq!(field, "deal_filters.days_lookback")
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("oversized lookback accepted"),
    }

    // The filter still builds a window if handed an unvalidated value
    let filter = DealFilter::new(&config.deal_filters, run_time());
    assert!(filter.accepts(&deal(Some("Accenture"), "Old Target", Some(10.0), days_ago(10_000))));

    let mut config = TrackerConfig::default();
    config.deal_filters.dedup_tolerance_days = MAX_DAYS + 1;
    assert!(matches!(
        config.validate(),
        Err(TrackerError::ConfigInvalid { field, .. }) if field == "deal_filters.dedup_tolerance_days"
    ));

    config.deal_filters.dedup_tolerance_days = MAX_DAYS;
    config.deal_filters.days_lookback = MAX_DAYS;
    assert!(config.validate().is_ok());
}

#[test]
fn test_report_sheets_and_writers() {
    init_tracing();
    let cache = MemoryFeedCache::new().with_feed("wire", wire_feed());
    let pipeline = TrackerPipeline::new(config_with_feeds(&["wire"]), Box::new(cache)).unwrap();
    let output = pipeline.run(run_time()).unwrap();

    let workbook = build_workbook(&output.deal_set, &output.report, run_time());
    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            report::DEAL_TRACKER,
            report::EXECUTIVE_SUMMARY,
            report::SECTOR_ANALYSIS,
            report::BUYER_ANALYSIS,
            report::TECHNOLOGY_TRENDS,
            report::GEOGRAPHIC_ANALYSIS,
            report::MONTHLY_TRENDS,
        ]
    );
    assert_eq!(workbook.sheet(report::DEAL_TRACKER).unwrap().len(), 1);

    let dir = TempDir::new().unwrap();
    let written = CsvReportWriter.write(&workbook, &dir.path().join("report")).unwrap();
    let csv = fs::read_to_string(written.join("deal_tracker.csv")).unwrap();
    assert!(csv.starts_with("Date,Headline,Buyer"));
    assert!(csv.contains("Cloud Consulting Ltd"));
    assert!(written.join("monthly_trends.csv").is_file());

    let json_path = JsonReportWriter.write(&workbook, &dir.path().join("report")).unwrap();
    assert_eq!(json_path.extension().and_then(|e| e.to_str()), Some("json"));
    let parsed: interfaces::Workbook =
        serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(parsed, workbook);

    let mut output_config = pipeline.config().output.clone();
    output_config.location = dir.path().to_path_buf();
    assert_eq!(
        report::output_path(&output_config, run_time()),
        dir.path().join("MA_Tracker_20250314")
    );
    let emitted = report::emit(&workbook, &output_config, run_time()).unwrap();
    assert!(emitted.join("executive_summary.csv").is_file());
}
