mod common;

use chrono::{Duration, TimeZone, Utc};
use common::init_tracing;
use deal_tracker::cache::{safe_name, METADATA_FILE};
use deal_tracker::{DirectoryFeedCache, FeedCache};
use std::fs;
use tempfile::TempDir;

const PAYLOAD: &str = "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>T</title></channel></rss>";

#[test]
fn test_safe_name() {
    assert_eq!(safe_name("UK Tech Exits!"), "uktechexits");
    assert_eq!(safe_name("consultancy-uk_news"), "consultancy-uk_news");
    assert_eq!(safe_name("../etc/passwd"), "etcpasswd");
}

#[test]
fn test_store_and_load() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let cache = DirectoryFeedCache::new(dir.path()).unwrap();
    let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();

    let entry = cache.store("UK Tech Exits", PAYLOAD, at).unwrap();

    assert_eq!(entry.safe_name, "uktechexits");
    assert_eq!(entry.filename, "uktechexits_20250314_093000.xml");
    assert_eq!(entry.cached_at, "20250314_093000");
    assert_eq!(entry.size_bytes, PAYLOAD.len() as u64);
    assert!(dir.path().join(METADATA_FILE).is_file());

    // Lookup goes through the safe name, so any spelling of the feed works
    assert_eq!(cache.load("uk tech exits").unwrap().as_deref(), Some(PAYLOAD));
    assert_eq!(cache.load("uktechexits").unwrap().as_deref(), Some(PAYLOAD));

    let listed = cache.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].feed_name, "UK Tech Exits");
    assert_eq!(cache.cached_feed_ids().unwrap(), vec!["uktechexits".to_string()]);
}

#[test]
fn test_latest_store_wins() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let cache = DirectoryFeedCache::new(dir.path()).unwrap();
    let first = Utc.with_ymd_and_hms(2025, 3, 13, 8, 0, 0).unwrap();

    cache.store("wire", "old payload", first).unwrap();
    let newer = cache.store("wire", "new payload", first + Duration::hours(1)).unwrap();

    assert_eq!(cache.latest_path("wire").unwrap(), Some(newer.filepath));
    assert_eq!(cache.load("wire").unwrap().as_deref(), Some("new payload"));
    assert_eq!(cache.list().unwrap().len(), 1);
}

#[test]
fn test_lookup_without_index() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("wire_20250101_120000.xml"), "january").unwrap();
    fs::write(dir.path().join("wire_20250301_120000.xml"), "march").unwrap();
    fs::write(dir.path().join("wire_extra_20250401_120000.xml"), "other feed").unwrap();
    fs::write(dir.path().join("plain.xml"), "plain payload").unwrap();

    let cache = DirectoryFeedCache::new(dir.path()).unwrap();

    assert_eq!(cache.load("wire").unwrap().as_deref(), Some("march"));
    assert_eq!(cache.load("plain").unwrap().as_deref(), Some("plain payload"));
    assert_eq!(cache.load("missing").unwrap(), None);
    assert!(cache.list().unwrap().is_empty());
}

#[test]
fn test_unusable_feed_name_rejected() {
    let dir = TempDir::new().unwrap();
    let cache = DirectoryFeedCache::new(dir.path()).unwrap();

    assert!(cache.store("!!!", PAYLOAD, Utc::now()).is_err());
    assert_eq!(cache.latest_path("!!!").unwrap(), None);
}

#[test]
fn test_unindexed_payloads_are_listed() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("reuters_20250310_080000.xml"), "stamped").unwrap();
    fs::write(dir.path().join("reuters_20250312_080000.xml"), "newer").unwrap();
    fs::write(dir.path().join("ft.xml"), "plain").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a feed").unwrap();

    let cache = DirectoryFeedCache::new(dir.path()).unwrap();
    cache
        .store("Deal Wire", PAYLOAD, Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap())
        .unwrap();

    assert_eq!(
        cache.cached_feed_ids().unwrap(),
        vec!["dealwire".to_string(), "ft".to_string(), "reuters".to_string()]
    );
    for id in cache.cached_feed_ids().unwrap() {
        assert!(cache.load(&id).unwrap().is_some(), "{} listed but not loadable", id);
    }
    assert_eq!(cache.load("reuters").unwrap().as_deref(), Some("newer"));
}
