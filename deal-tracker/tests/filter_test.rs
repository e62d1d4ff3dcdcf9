mod common;

use common::{days_ago, deal, init_tracing, run_time, with_sector};
use deal_tracker::config::DealFilters;
use deal_tracker::{ClassifiedDeal, Currency, DealFilter, Deduplicator};
use uuid::Uuid;

fn ids(deals: &[ClassifiedDeal]) -> Vec<Uuid> {
    deals.iter().map(|d| d.candidate.id).collect()
}

#[test]
fn test_value_above_range_excluded() {
    init_tracing();
    let filter = DealFilter::new(&DealFilters::default(), run_time());

    assert!(!filter.accepts(&deal(Some("Accenture"), "Big Target", Some(60.0), days_ago(1))));
    assert!(!filter.accepts(&deal(Some("Accenture"), "Tiny Target", Some(2.0), days_ago(1))));
    assert!(filter.accepts(&deal(Some("Accenture"), "Right Size", Some(50.0), days_ago(1))));
    assert!(filter.accepts(&deal(Some("Accenture"), "Right Size", Some(5.0), days_ago(1))));
}

#[test]
fn test_undisclosed_value_follows_setting() {
    init_tracing();
    let undisclosed = deal(Some("Accenture"), "Quiet Target", None, days_ago(1));

    let mut filters = DealFilters::default();
    assert!(DealFilter::new(&filters, run_time()).accepts(&undisclosed));

    filters.include_undisclosed = false;
    assert!(!DealFilter::new(&filters, run_time()).accepts(&undisclosed));
}

#[test]
fn test_lookback_window() {
    init_tracing();
    let filter = DealFilter::new(&DealFilters::default(), run_time());

    assert!(filter.accepts(&deal(Some("A"), "Edge", Some(10.0), days_ago(7))));
    assert!(!filter.accepts(&deal(Some("A"), "Old", Some(10.0), days_ago(8))));
    assert!(!filter.accepts(&deal(Some("A"), "Future", Some(10.0), days_ago(-1))));
}

#[test]
fn test_tracked_sectors() {
    init_tracing();
    let filters = DealFilters {
        sectors: vec!["it services".to_string()],
        ..DealFilters::default()
    };
    let filter = DealFilter::new(&filters, run_time());

    let it = deal(Some("A"), "Managed Co", Some(10.0), days_ago(1));
    let cyber = with_sector(deal(Some("A"), "Shield Co", Some(10.0), days_ago(1)), "Cybersecurity");

    assert!(filter.accepts(&it));
    assert!(!filter.accepts(&cyber));
}

#[test]
fn test_filter_is_idempotent() {
    init_tracing();
    let filter = DealFilter::new(&DealFilters::default(), run_time());
    let deals = vec![
        deal(Some("A"), "One", Some(10.0), days_ago(1)),
        deal(Some("B"), "Two", Some(90.0), days_ago(1)),
        deal(Some("C"), "Three", None, days_ago(3)),
        deal(Some("D"), "Four", Some(20.0), days_ago(30)),
    ];

    let once = filter.apply(deals);
    let twice = filter.apply(once.clone());
    assert_eq!(ids(&once), ids(&twice));
    assert_eq!(once.len(), 2);
}

#[test]
fn test_duplicate_reports_collapse_to_disclosed_record() {
    init_tracing();
    let disclosed = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(3));
    let undisclosed = deal(Some("Accenture"), "Cloud Consulting Ltd", None, days_ago(2));
    let keep = disclosed.candidate.id;

    let survivors = Deduplicator::new(3).deduplicate(vec![undisclosed, disclosed]);

    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].candidate.id, keep);
    assert_eq!(survivors[0].candidate.value_millions, Some(25.0));
}

#[test]
fn test_names_compared_case_and_space_insensitively() {
    init_tracing();
    let a = deal(Some("ACCENTURE"), "Cloud  Consulting Ltd", Some(25.0), days_ago(1));
    let b = deal(Some("accenture "), "cloud consulting ltd", Some(25.0), days_ago(2));

    assert!(Deduplicator::new(3).is_duplicate(&a, &b));
    assert_eq!(Deduplicator::new(3).deduplicate(vec![a, b]).len(), 1);
}

#[test]
fn test_distinct_transactions_kept() {
    init_tracing();
    let dedup = Deduplicator::new(3);

    // Outside the tolerance window
    let early = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(10));
    let late = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(1));
    assert_eq!(dedup.deduplicate(vec![early, late]).len(), 2);

    // Currency is part of the duplicate key
    let pounds = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(1));
    let mut dollars = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(1));
    dollars.candidate.currency = Some(Currency::Usd);
    assert!(!dedup.is_duplicate(&pounds, &dollars));
    assert_eq!(dedup.deduplicate(vec![pounds, dollars]).len(), 2);

    // Different buyer
    let a = deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(1));
    let b = deal(Some("Capgemini"), "Cloud Consulting Ltd", Some(25.0), days_ago(1));
    assert_eq!(dedup.deduplicate(vec![a, b]).len(), 2);
}

#[test]
fn test_tie_breaks() {
    init_tracing();
    let dedup = Deduplicator::new(3);

    // Equal confidence: the earliest report survives
    let first = deal(Some("Accenture"), "Nimbus", Some(20.0), days_ago(2));
    let second = deal(Some("Accenture"), "Nimbus", Some(20.0), days_ago(1));
    let keep = first.candidate.id;
    let survivors = dedup.deduplicate(vec![second, first]);
    assert_eq!(ids(&survivors), vec![keep]);

    // Equal confidence and date: the disclosed value survives
    let mut undisclosed = deal(Some("Accenture"), "Nimbus", None, days_ago(2));
    undisclosed.candidate.confidence = 1.0;
    let disclosed = deal(Some("Accenture"), "Nimbus", Some(20.0), days_ago(2));
    let keep = disclosed.candidate.id;
    let survivors = dedup.deduplicate(vec![undisclosed, disclosed]);
    assert_eq!(ids(&survivors), vec![keep]);
}

#[test]
fn test_chained_reports_form_one_cluster() {
    init_tracing();
    let deals = vec![
        deal(Some("Accenture"), "Nimbus", Some(20.0), days_ago(6)),
        deal(Some("Accenture"), "Nimbus", None, days_ago(3)),
        deal(Some("Accenture"), "Nimbus", None, days_ago(0)),
    ];

    assert_eq!(Deduplicator::new(3).deduplicate(deals).len(), 1);
}

#[test]
fn test_undisclosed_report_does_not_bridge_currencies() {
    init_tracing();
    let dedup = Deduplicator::new(3);

    let pounds = deal(Some("Accenture"), "Nimbus", Some(25.0), days_ago(3));
    let undisclosed = deal(Some("Accenture"), "Nimbus", None, days_ago(2));
    let mut dollars = deal(Some("Accenture"), "Nimbus", Some(25.0), days_ago(1));
    dollars.candidate.currency = Some(Currency::Usd);

    assert!(dedup.is_duplicate(&pounds, &undisclosed));
    assert!(dedup.is_duplicate(&undisclosed, &dollars));
    assert!(!dedup.is_duplicate(&pounds, &dollars));

    let expected = {
        let mut ids = vec![pounds.candidate.id, dollars.candidate.id];
        ids.sort();
        ids
    };
    for input in [
        vec![pounds.clone(), undisclosed.clone(), dollars.clone()],
        vec![dollars.clone(), undisclosed.clone(), pounds.clone()],
        vec![undisclosed, dollars, pounds],
    ] {
        let mut survivors = ids(&dedup.deduplicate(input));
        survivors.sort();
        assert_eq!(survivors, expected);
    }
}

#[test]
fn test_deduplication_ignores_input_order() {
    init_tracing();
    let deals = vec![
        deal(Some("Accenture"), "Cloud Consulting Ltd", Some(25.0), days_ago(3)),
        deal(Some("Accenture"), "Cloud Consulting Ltd", None, days_ago(2)),
        deal(Some("Capgemini"), "Nimbus", Some(12.0), days_ago(5)),
        deal(Some("Capgemini"), "Nimbus", Some(12.0), days_ago(4)),
        deal(Some("Horizon Capital"), "Shield Co", None, days_ago(1)),
        deal(None, "Orphan Co", None, days_ago(1)),
    ];
    let dedup = Deduplicator::new(3);

    let forward = dedup.deduplicate(deals.clone());
    let mut reversed_input = deals.clone();
    reversed_input.reverse();
    let reversed = dedup.deduplicate(reversed_input);
    let mut rotated_input = deals;
    rotated_input.rotate_left(2);
    let rotated = dedup.deduplicate(rotated_input);

    assert_eq!(forward.len(), 4);
    assert_eq!(ids(&forward), ids(&reversed));
    assert_eq!(ids(&forward), ids(&rotated));
}
