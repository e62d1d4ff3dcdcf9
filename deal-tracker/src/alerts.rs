use crate::config::AlertThresholds;
use crate::types::{BuyerType, DealSet, FinalDeal, Priority};
use crate::utils::{contains_word, normalize_name};
use std::collections::HashMap;
use tracing::debug;

/// Deal counts per normalized buyer name across the whole deal set.
#[derive(Debug, Clone, Default)]
pub struct BuyerFrequency {
    counts: HashMap<String, usize>,
}

impl BuyerFrequency {
    pub fn from_deals(deals: &DealSet) -> Self {
        let mut counts = HashMap::new();
        for deal in deals.iter() {
            if let Some(buyer) = deal.candidate().buyer.as_deref() {
                *counts.entry(normalize_name(buyer)).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn count(&self, buyer: &str) -> usize {
        self.counts.get(&normalize_name(buyer)).copied().unwrap_or(0)
    }
}

pub struct AlertEvaluator {
    high_value_threshold: f64,
    watchlist: Vec<String>,
    known_pe_firms: Vec<String>,
    roll_up_threshold: usize,
    frequency: BuyerFrequency,
}

impl AlertEvaluator {
    pub fn new(thresholds: &AlertThresholds, frequency: BuyerFrequency) -> Self {
        Self {
            high_value_threshold: thresholds.high_value_threshold_millions,
            watchlist: thresholds.competitor_watchlist.iter().map(|n| normalize_name(n)).collect(),
            known_pe_firms: thresholds.known_pe_firms.iter().map(|n| normalize_name(n)).collect(),
            roll_up_threshold: thresholds.roll_up_threshold,
            frequency,
        }
    }

    /// Priority plus the reasons that produced it.
    pub fn evaluate(&self, deal: &FinalDeal) -> (Priority, Vec<String>) {
        let high = self.high_reasons(deal);
        if !high.is_empty() {
            return (Priority::High, high);
        }

        let medium = self.medium_reasons(deal);
        if !medium.is_empty() {
            return (Priority::Medium, medium);
        }

        (Priority::Low, Vec::new())
    }

    fn high_reasons(&self, deal: &FinalDeal) -> Vec<String> {
        let candidate = deal.candidate();

        let value_reason = match candidate.value_millions {
            Some(value) if value > self.high_value_threshold => {
                format!("value {:.1}m above {:.1}m threshold", value, self.high_value_threshold)
            }
            Some(_) => return Vec::new(),
            None => "undisclosed value".to_string(),
        };

        let buyer_reason = if deal.deal.buyer_type == BuyerType::PrivateEquity {
            "PE buyer".to_string()
        } else if let Some(name) = candidate.buyer.as_deref().filter(|b| self.on_watchlist(b)) {
            format!("competitor {} on watch-list", name)
        } else {
            return Vec::new();
        };

        if deal.deal.technologies.is_empty() {
            return Vec::new();
        }
        let tech_reason = format!(
            "technology: {}",
            deal.deal.technologies.iter().cloned().collect::<Vec<_>>().join(", ")
        );

        vec![value_reason, buyer_reason, tech_reason]
    }

    fn medium_reasons(&self, deal: &FinalDeal) -> Vec<String> {
        let mut reasons = Vec::new();
        let buyer = deal.candidate().buyer.as_deref();
        let count = buyer.map_or(0, |b| self.frequency.count(b));

        if let Some(name) = buyer {
            if deal.deal.buyer_type == BuyerType::PrivateEquity
                && count == 1
                && !self.is_known_pe_firm(name)
            {
                reasons.push(format!("new PE buyer {}", name));
            }
            if count >= self.roll_up_threshold {
                reasons.push(format!("roll-up: {} has {} deals", name, count));
            }
        }

        if deal.deal.regions.len() >= 2 {
            reasons.push(format!("cross-border: {}", deal.deal.regions.join(" / ")));
        }

        reasons
    }

    fn on_watchlist(&self, buyer: &str) -> bool {
        let buyer = normalize_name(buyer);
        self.watchlist.iter().any(|entry| contains_word(&buyer, entry))
    }

    fn is_known_pe_firm(&self, buyer: &str) -> bool {
        let buyer = normalize_name(buyer);
        self.known_pe_firms.iter().any(|firm| contains_word(&buyer, firm))
    }
}

/// Assign priorities in place. The frequency table is built in a separate
/// pass first so every deal is judged against the same counts.
pub fn apply(thresholds: &AlertThresholds, deals: &mut DealSet) {
    let evaluator = AlertEvaluator::new(thresholds, BuyerFrequency::from_deals(deals));

    for deal in deals.deals.iter_mut() {
        let (priority, reasons) = evaluator.evaluate(deal);
        debug!("{} -> {} {:?}", deal.candidate().target, priority, reasons);
        deal.priority = priority;
        deal.alert_reasons = reasons;
    }
}
