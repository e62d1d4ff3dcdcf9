use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use deal_tracker::report::{build_workbook, emit};
use deal_tracker::{
    ConfigOverrides, DirectoryFeedCache, ReportFormat, TrackerConfig, TrackerPipeline,
};
use std::path::PathBuf;
use tracing::{info, Level};

/// Track M&A activity in consulting and technology services from cached news feeds
#[derive(Parser)]
#[command(name = "deal-tracker")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory holding cached feed payloads
    #[arg(long, value_name = "DIR")]
    feed_cache_dir: Option<PathBuf>,

    /// Lookback window in days
    #[arg(short, long)]
    days: Option<u32>,

    /// Only track this sector
    #[arg(short, long)]
    sector: Option<String>,

    /// Drop deals without a disclosed value
    #[arg(long)]
    disclosed_only: bool,

    /// Directory the report is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Store a fetched payload in the cache under NAME and exit
    #[arg(long, value_name = "NAME", requires = "content_file")]
    cache_feed: Option<String>,

    /// File holding the payload for --cache-feed
    #[arg(long, value_name = "PATH")]
    content_file: Option<PathBuf>,

    /// List cached feeds and exit
    #[arg(long, conflicts_with = "cache_feed")]
    list_cache: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cache_dir = cli
        .feed_cache_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("ma_tracker_feeds"));
    let cache = DirectoryFeedCache::new(&cache_dir)
        .with_context(|| format!("Cannot open feed cache {}", cache_dir.display()))?;

    if let Some(feed_name) = &cli.cache_feed {
        let Some(content_file) = &cli.content_file else {
            bail!("--cache-feed needs --content-file");
        };
        let content = std::fs::read_to_string(content_file)
            .with_context(|| format!("Cannot read {}", content_file.display()))?;
        let entry = cache.store(feed_name, &content, Utc::now())?;
        println!(
            "Cached {} ({} bytes) at {}",
            entry.feed_name,
            entry.size_bytes,
            entry.filepath.display()
        );
        return Ok(());
    }

    if cli.list_cache {
        let entries = cache.list()?;
        if entries.is_empty() {
            println!("No cached feeds in {}", cache_dir.display());
        }
        for entry in entries {
            println!("  - {} ({})", entry.feed_name, entry.filename);
            println!("    Cached at: {}", entry.cached_at);
            println!("    Size: {} bytes", entry.size_bytes);
            println!("    Path: {}", entry.filepath.display());
        }
        return Ok(());
    }

    let mut config = TrackerConfig::load(&cli.config)?;
    config.apply_overrides(&ConfigOverrides {
        days_lookback: cli.days,
        sector: cli.sector.clone(),
        disclosed_only: cli.disclosed_only,
        output_location: cli.output.clone(),
        format: cli.format,
    });

    info!("Reading feeds from {}", cache.dir().display());
    let pipeline = TrackerPipeline::new(config, Box::new(cache))?;

    let now = Utc::now();
    let output = pipeline.run(now)?;

    let workbook = build_workbook(&output.deal_set, &output.report, now);
    let written = emit(&workbook, &pipeline.config().output, now)?;

    println!("M&A tracker run complete");
    println!("  Feeds read: {}/{}", output.stats.feeds_read, output.stats.feeds_expected);
    println!("  Articles: {}", output.stats.articles);
    println!("  Candidate deals: {}", output.stats.candidates);
    println!("  Deals in report: {}", output.stats.final_deals);
    for (priority, count) in &output.report.priority_counts {
        println!("    {}: {}", priority, count);
    }
    println!("  Report: {}", written.display());

    if !output.warnings.is_empty() {
        println!("  Warnings ({}):", output.warnings.len());
        for warning in &output.warnings {
            println!("    {}", warning);
        }
    }

    Ok(())
}
