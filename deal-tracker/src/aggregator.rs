use crate::config::ValueRanges;
use crate::types::{BuyerType, DealSet, FinalDeal, Priority, UNCLASSIFIED_SECTOR, UNKNOWN_GEOGRAPHY};
use crate::utils::{normalize_name, time::month_key, time::months_between};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectorSummary {
    pub deals: usize,
    pub disclosed_deals: usize,
    pub total_value_millions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyerSummary {
    pub name: String,
    pub buyer_type: BuyerType,
    pub deals: usize,
    pub total_value_millions: f64,
    pub sectors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthSummary {
    pub deals: usize,
    pub total_value_millions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnologyCount {
    pub keyword: String,
    pub deals: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Read-only analytics derived from one run's deal set.
///
/// Every map is keyed in a fixed order (counts descending then label, or a
/// declared order) so the report is identical for any ordering of the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total_deals: usize,
    pub disclosed_deals: usize,
    pub total_disclosed_value_millions: f64,
    pub average_disclosed_value_millions: Option<f64>,
    pub date_range: Option<DateRange>,
    pub by_sector: IndexMap<String, SectorSummary>,
    pub by_buyer_type: IndexMap<String, usize>,
    pub by_geography: IndexMap<String, usize>,
    pub by_value_range: IndexMap<String, usize>,
    pub monthly: IndexMap<String, MonthSummary>,
    pub buyers: Vec<BuyerSummary>,
    pub most_active_buyer: Option<String>,
    pub hottest_sector: Option<String>,
    pub technology_ranking: Vec<TechnologyCount>,
    pub priority_counts: IndexMap<String, usize>,
    pub most_common_buyer_type: Option<BuyerType>,
    pub geographic_focus: Option<String>,
}

pub fn aggregate(deals: &DealSet, value_ranges: &ValueRanges) -> AggregateReport {
    let disclosed: Vec<f64> = deals.iter().filter_map(|d| d.candidate().value_millions).collect();
    let total_disclosed = stable_sum(disclosed.clone());

    let by_sector = sector_breakdown(deals);
    let by_buyer_type = count_sorted(deals.iter().map(|d| d.deal.buyer_type.to_string()));
    let by_geography = count_sorted(deals.iter().map(|d| d.deal.geography.clone()));
    let buyers = buyer_breakdown(deals);

    let mut by_value_range: IndexMap<String, usize> =
        value_ranges.labels().into_iter().map(|label| (label, 0)).collect();
    for deal in deals.iter() {
        *by_value_range.entry(deal.value_range.clone()).or_insert(0) += 1;
    }

    let mut priority_counts: IndexMap<String, usize> =
        [Priority::High, Priority::Medium, Priority::Low]
            .iter()
            .map(|p| (p.to_string(), 0))
            .collect();
    for deal in deals.iter() {
        *priority_counts.entry(deal.priority.to_string()).or_insert(0) += 1;
    }

    let most_common_buyer_type = most_common(deals.iter().map(|d| d.deal.buyer_type));

    let hottest_sector = by_sector
        .iter()
        .find(|(label, _)| label.as_str() != UNCLASSIFIED_SECTOR)
        .map(|(label, _)| label.clone());
    let geographic_focus = by_geography
        .keys()
        .find(|label| label.as_str() != UNKNOWN_GEOGRAPHY)
        .cloned();

    AggregateReport {
        total_deals: deals.len(),
        disclosed_deals: disclosed.len(),
        total_disclosed_value_millions: total_disclosed,
        average_disclosed_value_millions: (!disclosed.is_empty())
            .then(|| total_disclosed / disclosed.len() as f64),
        date_range: date_range(deals),
        monthly: monthly_series(deals),
        most_active_buyer: buyers.first().map(|b| b.name.clone()),
        technology_ranking: technology_ranking(deals),
        by_sector,
        by_buyer_type,
        by_geography,
        by_value_range,
        buyers,
        hottest_sector,
        priority_counts,
        most_common_buyer_type,
        geographic_focus,
    }
}

fn sector_breakdown(deals: &DealSet) -> IndexMap<String, SectorSummary> {
    let mut values: BTreeMap<&str, (usize, Vec<f64>)> = BTreeMap::new();
    for deal in deals.iter() {
        let entry = values.entry(deal.deal.sector.as_str()).or_default();
        entry.0 += 1;
        entry.1.extend(deal.candidate().value_millions);
    }

    let mut summaries: Vec<(String, SectorSummary)> = values
        .into_iter()
        .map(|(label, (count, values))| {
            let summary = SectorSummary {
                deals: count,
                disclosed_deals: values.len(),
                total_value_millions: stable_sum(values),
            };
            (label.to_string(), summary)
        })
        .collect();
    summaries.sort_by(|a, b| b.1.deals.cmp(&a.1.deals).then_with(|| a.0.cmp(&b.0)));
    summaries.into_iter().collect()
}

fn buyer_breakdown(deals: &DealSet) -> Vec<BuyerSummary> {
    struct Acc<'a> {
        spellings: BTreeSet<&'a str>,
        types: Vec<BuyerType>,
        values: Vec<f64>,
        sectors: BTreeSet<&'a str>,
        deals: usize,
    }

    let mut by_key: BTreeMap<String, Acc> = BTreeMap::new();
    for deal in deals.iter() {
        let Some(buyer) = deal.candidate().buyer.as_deref() else {
            continue;
        };
        let acc = by_key.entry(normalize_name(buyer)).or_insert_with(|| Acc {
            spellings: BTreeSet::new(),
            types: Vec::new(),
            values: Vec::new(),
            sectors: BTreeSet::new(),
            deals: 0,
        });
        acc.spellings.insert(buyer.trim());
        acc.types.push(deal.deal.buyer_type);
        acc.values.extend(deal.candidate().value_millions);
        acc.sectors.insert(deal.deal.sector.as_str());
        acc.deals += 1;
    }

    let mut buyers: Vec<(String, BuyerSummary)> = by_key
        .into_iter()
        .map(|(key, acc)| {
            let summary = BuyerSummary {
                name: acc.spellings.iter().next().map_or_else(|| key.clone(), |s| s.to_string()),
                buyer_type: most_common(acc.types.into_iter()).unwrap_or(BuyerType::Unknown),
                deals: acc.deals,
                total_value_millions: stable_sum(acc.values),
                sectors: acc.sectors.into_iter().map(str::to_string).collect(),
            };
            (key, summary)
        })
        .collect();

    // Ties on count go to the alphabetically first buyer
    buyers.sort_by(|a, b| b.1.deals.cmp(&a.1.deals).then_with(|| a.0.cmp(&b.0)));
    buyers.into_iter().map(|(_, summary)| summary).collect()
}

fn technology_ranking(deals: &DealSet) -> Vec<TechnologyCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for deal in deals.iter() {
        for keyword in &deal.deal.technologies {
            *counts.entry(keyword.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranking: Vec<TechnologyCount> = counts
        .into_iter()
        .map(|(keyword, deals)| TechnologyCount {
            keyword: keyword.to_string(),
            deals,
        })
        .collect();
    ranking.sort_by(|a, b| b.deals.cmp(&a.deals).then_with(|| a.keyword.cmp(&b.keyword)));
    ranking
}

fn date_range(deals: &DealSet) -> Option<DateRange> {
    let dates = deals.iter().map(announced_date);
    let start = dates.clone().min()?;
    let end = dates.max()?;
    Some(DateRange { start, end })
}

/// Calendar months from the first to the last deal, empty months included.
fn monthly_series(deals: &DealSet) -> IndexMap<String, MonthSummary> {
    let Some(range) = date_range(deals) else {
        return IndexMap::new();
    };

    let mut values: BTreeMap<String, (usize, Vec<f64>)> = BTreeMap::new();
    for deal in deals.iter() {
        let entry = values.entry(month_key(announced_date(deal))).or_default();
        entry.0 += 1;
        entry.1.extend(deal.candidate().value_millions);
    }

    months_between(range.start, range.end)
        .into_iter()
        .map(|month| {
            let summary = values
                .remove(&month)
                .map(|(deals, values)| MonthSummary {
                    deals,
                    total_value_millions: stable_sum(values),
                })
                .unwrap_or_default();
            (month, summary)
        })
        .collect()
}

fn announced_date(deal: &FinalDeal) -> NaiveDate {
    deal.candidate().announced_at.date_naive()
}

/// Label counts ordered by count descending, then label.
fn count_sorted(labels: impl Iterator<Item = String>) -> IndexMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.into_iter().collect()
}

fn most_common<T: Ord + Copy>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    // max_by_key keeps the last maximum, so walk in reverse to prefer the smallest key
    counts.into_iter().rev().max_by_key(|(_, count)| *count).map(|(item, _)| item)
}

/// Sum in sorted order so float rounding does not depend on input order.
fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}
