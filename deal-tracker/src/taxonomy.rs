use crate::config::TrackerConfig;
use crate::utils::contains_word;

/// A labelled keyword set, keywords stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub label: String,
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(label: impl Into<String>, keywords: &[String]) -> Self {
        Self {
            label: label.into(),
            keywords: lowercase_all(keywords),
        }
    }

    /// Whole-word hit of any keyword in already lowercased text.
    pub fn matches(&self, lower_text: &str) -> bool {
        self.keywords.iter().any(|kw| contains_word(lower_text, kw))
    }
}

/// Immutable keyword lookups compiled once per run from the configuration.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub sectors: Vec<Category>,
    pub regions: Vec<Category>,
    pub technologies: Vec<String>,
    pub pe_indicators: Vec<String>,
    pub pe_name_suffixes: Vec<String>,
    pub strategic_indicators: Vec<String>,
}

impl Taxonomy {
    pub fn from_config(config: &TrackerConfig) -> Self {
        let sectors = config
            .sector_taxonomy()
            .iter()
            .map(|(label, keywords)| Category::new(label.clone(), keywords))
            .collect();

        let regions = config
            .geographic_mapping
            .0
            .iter()
            .map(|(label, keywords)| Category::new(label.clone(), keywords))
            .collect();

        let mut technologies = Vec::new();
        for keyword in config
            .technology_keywords
            .tier1
            .iter()
            .chain(config.technology_keywords.tier2.iter())
        {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !technologies.contains(&keyword) {
                technologies.push(keyword);
            }
        }

        let classification = &config.buyer_classification;
        Self {
            sectors,
            regions,
            technologies,
            pe_indicators: lowercase_all(&classification.private_equity_indicators),
            pe_name_suffixes: lowercase_all(&classification.pe_name_suffixes),
            strategic_indicators: lowercase_all(&classification.strategic_indicators),
        }
    }

    /// Labels of every sector with a keyword hit, in declaration order.
    pub fn matching_sectors(&self, lower_text: &str) -> Vec<String> {
        matching_labels(&self.sectors, lower_text)
    }

    pub fn has_sector_keyword(&self, lower_text: &str) -> bool {
        self.sectors.iter().any(|sector| sector.matches(lower_text))
    }

    /// Labels of every region mentioned, in declaration order.
    pub fn matching_regions(&self, lower_text: &str) -> Vec<String> {
        matching_labels(&self.regions, lower_text)
    }

    /// Technology terms present as plain substrings.
    pub fn matching_technologies(&self, lower_text: &str) -> Vec<String> {
        self.technologies
            .iter()
            .filter(|term| lower_text.contains(term.as_str()))
            .cloned()
            .collect()
    }
}

fn matching_labels(categories: &[Category], lower_text: &str) -> Vec<String> {
    categories
        .iter()
        .filter(|category| category.matches(lower_text))
        .map(|category| category.label.clone())
        .collect()
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
