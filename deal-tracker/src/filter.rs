use crate::config::DealFilters;
use crate::types::{ClassifiedDeal, Currency};
use crate::utils::normalize_name;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Date, value and sector predicate over classified deals.
#[derive(Debug, Clone)]
pub struct DealFilter {
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
    min_value: f64,
    max_value: f64,
    include_undisclosed: bool,
    tracked_sectors: Vec<String>,
}

impl DealFilter {
    pub fn new(filters: &DealFilters, now: DateTime<Utc>) -> Self {
        Self {
            window_start: now
                .checked_sub_signed(Duration::days(i64::from(filters.days_lookback)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            now,
            min_value: filters.turnover_range_millions.min,
            max_value: filters.turnover_range_millions.max,
            include_undisclosed: filters.include_undisclosed,
            tracked_sectors: filters.sectors.iter().map(|s| s.trim().to_lowercase()).collect(),
        }
    }

    pub fn accepts(&self, deal: &ClassifiedDeal) -> bool {
        let announced = deal.candidate.announced_at;
        if announced < self.window_start || announced > self.now {
            return false;
        }

        let value_ok = match deal.candidate.value_millions {
            Some(value) => value >= self.min_value && value <= self.max_value,
            None => self.include_undisclosed,
        };
        if !value_ok {
            return false;
        }

        self.tracked_sectors.is_empty()
            || self.tracked_sectors.contains(&deal.sector.to_lowercase())
    }

    pub fn apply(&self, deals: Vec<ClassifiedDeal>) -> Vec<ClassifiedDeal> {
        let before = deals.len();
        let kept: Vec<ClassifiedDeal> = deals
            .into_iter()
            .filter(|deal| {
                let keep = self.accepts(deal);
                if !keep {
                    debug!(
                        "Filtered out {} ({:?}, {})",
                        deal.candidate.target, deal.candidate.value_millions, deal.sector
                    );
                }
                keep
            })
            .collect();

        info!("Filter kept {}/{} deals", kept.len(), before);
        kept
    }
}

/// Collapses reports of the same transaction into one record.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    tolerance: Duration,
}

impl Deduplicator {
    pub fn new(tolerance_days: u32) -> Self {
        Self {
            tolerance: Duration::days(i64::from(tolerance_days)),
        }
    }

    /// Same parties, dates within tolerance, and no conflicting currencies.
    pub fn is_duplicate(&self, a: &ClassifiedDeal, b: &ClassifiedDeal) -> bool {
        let (a, b) = (&a.candidate, &b.candidate);

        if party_key(a.buyer.as_deref(), &a.target) != party_key(b.buyer.as_deref(), &b.target) {
            return false;
        }
        if (a.announced_at - b.announced_at).abs() > self.tolerance {
            return false;
        }
        currencies_compatible(a.currency, b.currency)
    }

    /// Returns one survivor per group of duplicates. Groups are connected
    /// components of the duplicate relation, so the result does not depend
    /// on input order.
    pub fn deduplicate(&self, deals: Vec<ClassifiedDeal>) -> Vec<ClassifiedDeal> {
        let before = deals.len();

        let mut by_parties: BTreeMap<(String, String), Vec<ClassifiedDeal>> = BTreeMap::new();
        for deal in deals {
            let key = party_key(deal.candidate.buyer.as_deref(), &deal.candidate.target);
            by_parties.entry(key).or_default().push(deal);
        }

        let mut survivors = Vec::new();
        for (_, mut group) in by_parties {
            group.sort_by(preference);
            survivors.extend(self.collapse_group(group));
        }

        survivors.sort_by(report_order);

        let removed = before - survivors.len();
        if removed > 0 {
            info!("Removed {} duplicate deals", removed);
        }
        survivors
    }

    /// Clusters one party group. A cluster carries at most one currency, so an
    /// undisclosed report joins the first compatible cluster in preference
    /// order and never bridges two currencies.
    fn collapse_group(&self, group: Vec<ClassifiedDeal>) -> Vec<ClassifiedDeal> {
        let mut parent: Vec<usize> = (0..group.len()).collect();
        let mut cluster_currency: Vec<Option<Currency>> =
            group.iter().map(|d| d.candidate.currency).collect();

        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                if !self.is_duplicate(&group[i], &group[j]) {
                    continue;
                }
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri == rj || !currencies_compatible(cluster_currency[ri], cluster_currency[rj]) {
                    continue;
                }
                // Group is sorted best-first, so the smaller index stays root
                let (root, child) = (ri.min(rj), ri.max(rj));
                parent[child] = root;
                cluster_currency[root] = cluster_currency[root].or(cluster_currency[child]);
            }
        }

        group
            .into_iter()
            .enumerate()
            .filter_map(|(index, deal)| {
                if find_root(&mut parent, index) == index {
                    Some(deal)
                } else {
                    debug!(
                        "Dropping duplicate report of {} from {}",
                        deal.candidate.target, deal.candidate.url
                    );
                    None
                }
            })
            .collect()
    }
}

fn find_root(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

fn party_key(buyer: Option<&str>, target: &str) -> (String, String) {
    (buyer.map(normalize_name).unwrap_or_default(), normalize_name(target))
}

fn currencies_compatible(a: Option<Currency>, b: Option<Currency>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Survivor order: highest confidence, then earliest date, then disclosed value.
/// Remaining ties fall back to stable record fields.
pub fn preference(a: &ClassifiedDeal, b: &ClassifiedDeal) -> Ordering {
    let (a, b) = (&a.candidate, &b.candidate);
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.announced_at.cmp(&b.announced_at))
        .then_with(|| b.value_millions.is_some().cmp(&a.value_millions.is_some()))
        .then_with(|| a.url.cmp(&b.url))
        .then_with(|| a.headline.cmp(&b.headline))
        .then_with(|| a.id.cmp(&b.id))
}

/// Newest first, then by parties.
fn report_order(a: &ClassifiedDeal, b: &ClassifiedDeal) -> Ordering {
    let (ca, cb) = (&a.candidate, &b.candidate);
    cb.announced_at
        .cmp(&ca.announced_at)
        .then_with(|| {
            let key_a = party_key(ca.buyer.as_deref(), &ca.target);
            key_a.cmp(&party_key(cb.buyer.as_deref(), &cb.target))
        })
        .then_with(|| preference(a, b))
}
