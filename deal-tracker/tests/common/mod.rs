#![allow(dead_code)]

// Shared fixtures for the deal-tracker integration tests
use chrono::{DateTime, Duration, TimeZone, Utc};
use deal_tracker::{
    Article, BuyerType, CandidateDeal, ClassifiedDeal, Currency, DealClassifier, DealExtractor,
    Taxonomy, TrackerConfig,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

/// Fixed run timestamp so date windows are deterministic.
pub fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    run_time() - Duration::days(days)
}

pub fn article(title: &str, body: &str) -> Article {
    Article {
        feed_id: "test-feed".to_string(),
        source: "Test Wire".to_string(),
        guid: None,
        title: title.to_string(),
        body: body.to_string(),
        published_at: days_ago(1),
        url: format!("https://news.example.com/{}", title.len()),
    }
}

pub fn extractor_and_classifier(config: &TrackerConfig) -> (DealExtractor, DealClassifier) {
    let taxonomy = Arc::new(Taxonomy::from_config(config));
    let extractor = DealExtractor::new(config, taxonomy.clone()).unwrap();
    (extractor, DealClassifier::new(taxonomy))
}

/// A classified deal built by hand, bypassing extraction.
pub fn deal(
    buyer: Option<&str>,
    target: &str,
    value: Option<f64>,
    announced_at: DateTime<Utc>,
) -> ClassifiedDeal {
    ClassifiedDeal {
        candidate: CandidateDeal {
            id: Uuid::new_v4(),
            feed_id: "test-feed".to_string(),
            source: "Test Wire".to_string(),
            headline: format!("{} acquires {}", buyer.unwrap_or("Someone"), target),
            buyer: buyer.map(str::to_string),
            target: target.to_string(),
            value_expression: value.map(|v| format!("£{}m", v)),
            value_millions: value,
            currency: value.map(|_| Currency::Gbp),
            announced_at,
            url: format!(
                "https://news.example.com/{}/{}",
                target.replace(' ', "-"),
                announced_at.timestamp()
            ),
            confidence: if value.is_some() { 1.0 } else { 0.9 },
            matched_pattern: "acquires".to_string(),
            rationale: String::new(),
            needs_review: buyer.is_none(),
            ambiguous: false,
        },
        buyer_type: if buyer.is_some() { BuyerType::Strategic } else { BuyerType::Unknown },
        sector: "IT Services".to_string(),
        sectors: vec!["IT Services".to_string()],
        technologies: BTreeSet::new(),
        geography: "UK".to_string(),
        regions: vec!["UK".to_string()],
    }
}

pub fn with_sector(mut deal: ClassifiedDeal, sector: &str) -> ClassifiedDeal {
    deal.sector = sector.to_string();
    deal.sectors = vec![sector.to_string()];
    deal
}

pub fn with_technologies(mut deal: ClassifiedDeal, technologies: &[&str]) -> ClassifiedDeal {
    deal.technologies = technologies.iter().map(|t| t.to_string()).collect();
    deal
}

pub fn rss_feed(title: &str, items: &[(&str, &str, &str, &str)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n<title>{}</title>\n<link>https://news.example.com</link>\n<description>Deal news</description>\n",
        title
    );
    for (item_title, description, link, pub_date) in items {
        xml.push_str(&format!(
            "<item>\n<title>{}</title>\n<description>{}</description>\n<link>{}</link>\n<guid>{}</guid>\n<pubDate>{}</pubDate>\n</item>\n",
            item_title, description, link, link, pub_date
        ));
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}
