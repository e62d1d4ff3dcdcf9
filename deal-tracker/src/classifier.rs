use crate::taxonomy::Taxonomy;
use crate::types::{
    BuyerType, CandidateDeal, ClassifiedDeal, UNCLASSIFIED_SECTOR, UNKNOWN_GEOGRAPHY,
};
use crate::utils::contains_word;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Assigns buyer type, sector, technology and geography tags to candidates.
/// A pure function of the candidate, its article text and the taxonomy.
pub struct DealClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl DealClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn classify(&self, candidate: CandidateDeal, article_text: &str) -> ClassifiedDeal {
        let lower = article_text.to_lowercase();

        let buyer_type = self.buyer_type(candidate.buyer.as_deref(), &lower);

        let sectors = self.taxonomy.matching_sectors(&lower);
        let sector = sectors
            .first()
            .cloned()
            .unwrap_or_else(|| UNCLASSIFIED_SECTOR.to_string());

        let technologies: BTreeSet<String> = self
            .taxonomy
            .matching_technologies(&lower)
            .into_iter()
            .collect();

        let regions = self.taxonomy.matching_regions(&lower);
        let geography = regions
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_GEOGRAPHY.to_string());

        debug!(
            "Classified {} -> {}: {} / {} / {}",
            candidate.buyer.as_deref().unwrap_or("?"),
            candidate.target,
            buyer_type,
            sector,
            geography
        );

        ClassifiedDeal {
            candidate,
            buyer_type,
            sector,
            sectors,
            technologies,
            geography,
            regions,
        }
    }

    /// PE indicators win over strategic ones; a named acquirer with no PE
    /// signal is an operating company.
    pub fn buyer_type(&self, buyer: Option<&str>, lower_text: &str) -> BuyerType {
        let buyer_lower = buyer.map(|b| b.to_lowercase());

        let pe_term = self.taxonomy.pe_indicators.iter().any(|indicator| {
            contains_word(lower_text, indicator)
                || buyer_lower
                    .as_deref()
                    .map_or(false, |b| contains_word(b, indicator))
        });
        let pe_suffix = buyer_lower
            .as_deref()
            .and_then(|b| b.split_whitespace().last())
            .map_or(false, |last| {
                self.taxonomy.pe_name_suffixes.iter().any(|suffix| suffix == last)
            });

        if pe_term || pe_suffix {
            return BuyerType::PrivateEquity;
        }

        let strategic_term = self
            .taxonomy
            .strategic_indicators
            .iter()
            .any(|indicator| contains_word(lower_text, indicator));

        if strategic_term || buyer.is_some() {
            BuyerType::Strategic
        } else {
            BuyerType::Unknown
        }
    }
}
