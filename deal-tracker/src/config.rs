use crate::extractor::expand_pattern;
use crate::types::{FeedSpec, Result, TrackerError, UNDISCLOSED_RANGE};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Upper bound for day-based windows, roughly a century.
pub const MAX_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub deal_filters: DealFilters,
    /// Replacement keyword lists for the built-in sectors.
    pub sector_keywords: IndexMap<String, Vec<String>>,
    /// Extra sectors, appended after the built-in taxonomy.
    pub custom_sectors: IndexMap<String, Vec<String>>,
    pub buyer_classification: BuyerClassification,
    pub technology_keywords: TechnologyKeywords,
    pub geographic_mapping: GeographicMapping,
    pub value_ranges: ValueRanges,
    pub alerts: AlertThresholds,
    pub extraction: ExtractionConfig,
    pub feeds: Vec<FeedSpec>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnoverRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TurnoverRange {
    fn default() -> Self {
        Self { min: 5.0, max: 50.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DealFilters {
    pub turnover_range_millions: TurnoverRange,
    pub include_undisclosed: bool,
    pub days_lookback: u32,
    /// Tracked sectors; empty means every sector.
    pub sectors: Vec<String>,
    pub excluded_keywords: Vec<String>,
    pub dedup_tolerance_days: u32,
    pub max_entries_per_feed: usize,
}

impl Default for DealFilters {
    fn default() -> Self {
        Self {
            turnover_range_millions: TurnoverRange::default(),
            include_undisclosed: true,
            days_lookback: 7,
            sectors: Vec::new(),
            excluded_keywords: Vec::new(),
            dedup_tolerance_days: 3,
            max_entries_per_feed: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyerClassification {
    pub private_equity_indicators: Vec<String>,
    pub pe_name_suffixes: Vec<String>,
    pub strategic_indicators: Vec<String>,
}

impl Default for BuyerClassification {
    fn default() -> Self {
        Self {
            private_equity_indicators: strings(&[
                "private equity",
                "pe firm",
                "pe-backed",
                "portfolio company",
                "investment firm",
            ]),
            pe_name_suffixes: strings(&["Partners", "Capital", "Holdings"]),
            strategic_indicators: strings(&["strategic acquisition", "synergies"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyKeywords {
    pub tier1: Vec<String>,
    pub tier2: Vec<String>,
}

impl Default for TechnologyKeywords {
    fn default() -> Self {
        Self {
            tier1: strings(&[
                "cybersecurity",
                "artificial intelligence",
                "machine learning",
                "generative ai",
                "cloud",
                "data analytics",
                "automation",
                "digital transformation",
            ]),
            tier2: strings(&[
                "salesforce",
                "servicenow",
                "microsoft dynamics",
                "amazon web services",
                "azure",
                "devops",
                "crm",
                "blockchain",
                "internet of things",
            ]),
        }
    }
}

/// Region label to keyword list, declaration order preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeographicMapping(pub IndexMap<String, Vec<String>>);

impl Default for GeographicMapping {
    fn default() -> Self {
        let mut regions = IndexMap::new();
        regions.insert(
            "UK".to_string(),
            strings(&[
                "uk",
                "united kingdom",
                "britain",
                "british",
                "england",
                "scotland",
                "wales",
                "london",
                "manchester",
                "edinburgh",
            ]),
        );
        regions.insert(
            "Ireland".to_string(),
            strings(&["ireland", "irish", "dublin"]),
        );
        regions.insert(
            "Nordics".to_string(),
            strings(&[
                "sweden", "norway", "denmark", "finland", "nordic", "nordics", "stockholm", "oslo",
                "copenhagen", "helsinki",
            ]),
        );
        regions.insert(
            "DACH".to_string(),
            strings(&[
                "germany", "german", "austria", "switzerland", "swiss", "berlin", "munich",
                "zurich",
            ]),
        );
        regions.insert(
            "Benelux".to_string(),
            strings(&["netherlands", "dutch", "belgium", "luxembourg", "amsterdam", "brussels"]),
        );
        regions.insert("France".to_string(), strings(&["france", "french", "paris"]));
        regions.insert(
            "North America".to_string(),
            strings(&[
                "united states",
                "usa",
                "u.s.",
                "american",
                "canada",
                "canadian",
                "new york",
                "california",
                "texas",
            ]),
        );
        regions.insert(
            "India".to_string(),
            strings(&["india", "indian", "bangalore", "bengaluru", "mumbai"]),
        );
        GeographicMapping(regions)
    }
}

/// One labelled reporting bucket; a value lands in the first bucket whose
/// `max` is absent or not exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub label: String,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueRanges(pub Vec<ValueRange>);

impl Default for ValueRanges {
    fn default() -> Self {
        let range = |label: &str, max: Option<f64>| ValueRange {
            label: label.to_string(),
            max,
        };
        ValueRanges(vec![
            range("Up to £5m", Some(5.0)),
            range("£5-10m", Some(10.0)),
            range("£10-25m", Some(25.0)),
            range("£25-50m", Some(50.0)),
            range("Over £50m", None),
        ])
    }
}

impl ValueRanges {
    pub fn label_for(&self, value: Option<f64>) -> String {
        let Some(value) = value else {
            return UNDISCLOSED_RANGE.to_string();
        };

        self.0
            .iter()
            .find(|range| range.max.map_or(true, |max| value <= max))
            // Every bucket capped below the value: report it in the top bucket
            .or_else(|| self.0.last())
            .map(|range| range.label.clone())
            .unwrap_or_else(|| UNDISCLOSED_RANGE.to_string())
    }

    /// Bucket labels in reporting order, ending with the undisclosed bucket.
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.0.iter().map(|r| r.label.clone()).collect();
        labels.push(UNDISCLOSED_RANGE.to_string());
        labels
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub high_value_threshold_millions: f64,
    pub competitor_watchlist: Vec<String>,
    pub known_pe_firms: Vec<String>,
    pub roll_up_threshold: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_value_threshold_millions: 25.0,
            competitor_watchlist: Vec::new(),
            known_pe_firms: Vec::new(),
            roll_up_threshold: 3,
        }
    }
}

/// One row of the extraction pattern table. Lower `priority` wins ties.
///
/// `{name}` expands to a greedy proper-noun phrase and `{short_name}` to the
/// shortest one that still lets the rest of the pattern match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub buyer_group: Option<usize>,
    pub target_group: usize,
    pub priority: u32,
}

impl PatternRule {
    fn new(
        name: &str,
        pattern: &str,
        buyer_group: Option<usize>,
        target_group: usize,
        priority: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            buyer_group,
            target_group,
            priority,
        }
    }
}

pub fn default_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "acquisition_of_by",
            r"(?i:acquisition|purchase|takeover)\s+(?i:of)\s+({short_name})\s+(?i:by)\s+({name})",
            Some(2),
            1,
            0,
        ),
        PatternRule::new(
            "acquired_by",
            r"({short_name})\s+(?i:(?:has\s+been\s+|was\s+|is\s+being\s+|to\s+be\s+)?(?:acquired|bought|snapped\s+up)\s+by)\s+({name})",
            Some(2),
            1,
            1,
        ),
        PatternRule::new(
            "to_acquire",
            r"({short_name})\s+(?i:(?:(?:has\s+)?(?:agreed|agrees|plans|is\s+set|set|moves|looks|is\s+poised|is)\s+)?to\s+(?:acquire|buy))\s+({name})",
            Some(1),
            2,
            2,
        ),
        PatternRule::new(
            "acquires",
            r"({short_name})\s+(?i:(?:has\s+)?(?:acquires|acquired|buys|bought|snaps\s+up|(?:completes|announces)\s+(?:the\s+)?acquisition\s+of))\s+({name})",
            Some(1),
            2,
            3,
        ),
        PatternRule::new(
            "merger_with",
            r"({short_name})\s+(?i:(?:(?:announces|agrees|completes|agreed|completed)\s+(?:a\s+)?merger|merges|merged|to\s+merge|merger)\s+with)\s+({name})",
            Some(1),
            2,
            4,
        ),
        PatternRule::new(
            "target_acquired",
            r"({short_name})\s+(?i:(?:has\s+been|was|is\s+being|to\s+be)\s+(?:acquired|bought|sold))\b",
            None,
            1,
            5,
        ),
        PatternRule::new(
            "acquisition_of",
            r"(?i:acquisition|takeover)\s+(?i:of)\s+({name})",
            None,
            1,
            6,
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub patterns: Vec<PatternRule>,
    pub min_confidence: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            min_confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub location: PathBuf,
    pub filename_pattern: String,
    pub format: ReportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("."),
            filename_pattern: "MA_Tracker_{date}".to_string(),
            format: ReportFormat::Csv,
        }
    }
}

/// Command-line overrides applied on top of the file configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub days_lookback: Option<u32>,
    pub sector: Option<String>,
    pub disclosed_only: bool,
    pub output_location: Option<PathBuf>,
    pub format: Option<ReportFormat>,
}

/// Built-in sector taxonomy in declaration order.
pub fn builtin_sectors() -> IndexMap<String, Vec<String>> {
    let mut sectors = IndexMap::new();
    sectors.insert(
        "Consulting".to_string(),
        strings(&[
            "management consulting",
            "strategy consulting",
            "consultancy",
            "advisory firm",
            "professional services",
        ]),
    );
    sectors.insert(
        "IT Services".to_string(),
        strings(&[
            "it services",
            "managed services",
            "managed service provider",
            "it consultancy",
            "cloud consulting",
            "systems integrator",
            "system integration",
            "technology services",
            "outsourcing",
            "it support",
        ]),
    );
    sectors.insert(
        "Digital Transformation".to_string(),
        strings(&[
            "digital transformation",
            "digital agency",
            "digital consultancy",
            "digital services",
            "customer experience",
            "modernisation",
            "modernization",
        ]),
    );
    sectors.insert(
        "Cloud & Infrastructure".to_string(),
        strings(&[
            "cloud",
            "infrastructure",
            "data centre",
            "data center",
            "hosting",
            "amazon web services",
            "azure",
            "google cloud",
        ]),
    );
    sectors.insert(
        "Cybersecurity".to_string(),
        strings(&[
            "cybersecurity",
            "cyber security",
            "cyber",
            "security services",
            "managed security",
            "penetration testing",
        ]),
    );
    sectors.insert(
        "Data & Analytics".to_string(),
        strings(&[
            "data analytics",
            "analytics",
            "business intelligence",
            "data engineering",
            "data platform",
            "big data",
        ]),
    );
    sectors.insert(
        "AI & Automation".to_string(),
        strings(&[
            "artificial intelligence",
            "machine learning",
            "generative ai",
            "automation",
            "robotic process automation",
        ]),
    );
    sectors
}

impl TrackerConfig {
    /// Load a JSON configuration file; a missing file falls back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content).map_err(|e| match e {
            TrackerError::ConfigInvalid { reason, .. } => {
                TrackerError::config(path.display().to_string(), reason)
            }
            other => other,
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            TrackerError::config(
                "<config>",
                format!("malformed JSON at line {} column {}: {}", e.line(), e.column(), e),
            )
        })
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(days) = overrides.days_lookback {
            self.deal_filters.days_lookback = days;
        }
        if let Some(sector) = &overrides.sector {
            self.deal_filters.sectors = vec![sector.clone()];
        }
        if overrides.disclosed_only {
            self.deal_filters.include_undisclosed = false;
        }
        if let Some(location) = &overrides.output_location {
            self.output.location = location.clone();
        }
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
    }

    /// Sector taxonomy after overrides and custom sectors, in matching order.
    pub fn sector_taxonomy(&self) -> IndexMap<String, Vec<String>> {
        let mut sectors = builtin_sectors();
        for (name, keywords) in &self.sector_keywords {
            if let Some(existing) = sectors.get_mut(name) {
                *existing = keywords.clone();
            }
        }
        for (name, keywords) in &self.custom_sectors {
            sectors
                .entry(name.clone())
                .or_insert_with(Vec::new)
                .extend(keywords.iter().cloned());
        }
        sectors
    }

    /// Reject configurations that would make the run meaningless.
    /// Runs before any feed is read.
    pub fn validate(&self) -> Result<()> {
        let filters = &self.deal_filters;
        let range = filters.turnover_range_millions;

        if !range.min.is_finite() || !range.max.is_finite() {
            return Err(TrackerError::config(
                "deal_filters.turnover_range_millions",
                "bounds must be finite numbers",
            ));
        }
        if range.min < 0.0 {
            return Err(TrackerError::config(
                "deal_filters.turnover_range_millions.min",
                format!("must not be negative (got {})", range.min),
            ));
        }
        if range.min > range.max {
            return Err(TrackerError::config(
                "deal_filters.turnover_range_millions",
                format!("min ({}) is greater than max ({})", range.min, range.max),
            ));
        }
        for (field, days) in [
            ("deal_filters.days_lookback", filters.days_lookback),
            ("deal_filters.dedup_tolerance_days", filters.dedup_tolerance_days),
        ] {
            if days > MAX_DAYS {
                return Err(TrackerError::config(
                    field,
                    format!("must be at most {} days (got {})", MAX_DAYS, days),
                ));
            }
        }
        if filters.max_entries_per_feed == 0 {
            return Err(TrackerError::config(
                "deal_filters.max_entries_per_feed",
                "must be at least 1",
            ));
        }
        if filters.sectors.iter().any(|s| s.trim().is_empty()) {
            return Err(TrackerError::config(
                "deal_filters.sectors",
                "sector names must not be blank",
            ));
        }
        if filters.excluded_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(TrackerError::config(
                "deal_filters.excluded_keywords",
                "keywords must not be blank",
            ));
        }

        for (name, keywords) in self.sector_keywords.iter() {
            if !builtin_sectors().contains_key(name) {
                return Err(TrackerError::config(
                    format!("sector_keywords.{}", name),
                    "not a built-in sector; use custom_sectors instead",
                ));
            }
            validate_keywords(&format!("sector_keywords.{}", name), keywords)?;
        }
        for (name, keywords) in self.custom_sectors.iter() {
            if name.trim().is_empty() {
                return Err(TrackerError::config(
                    "custom_sectors",
                    "sector names must not be blank",
                ));
            }
            validate_keywords(&format!("custom_sectors.{}", name), keywords)?;
        }
        for (region, keywords) in self.geographic_mapping.0.iter() {
            if region.trim().is_empty() {
                return Err(TrackerError::config(
                    "geographic_mapping",
                    "region names must not be blank",
                ));
            }
            validate_keywords(&format!("geographic_mapping.{}", region), keywords)?;
        }

        self.validate_value_ranges()?;

        let alerts = &self.alerts;
        if !alerts.high_value_threshold_millions.is_finite()
            || alerts.high_value_threshold_millions < 0.0
        {
            return Err(TrackerError::config(
                "alerts.high_value_threshold_millions",
                "must be a non-negative finite number",
            ));
        }
        if alerts.roll_up_threshold < 2 {
            return Err(TrackerError::config(
                "alerts.roll_up_threshold",
                format!("must be at least 2 (got {})", alerts.roll_up_threshold),
            ));
        }

        let extraction = &self.extraction;
        if !(0.0..=1.0).contains(&extraction.min_confidence) {
            return Err(TrackerError::config(
                "extraction.min_confidence",
                format!("must lie in [0, 1] (got {})", extraction.min_confidence),
            ));
        }
        if extraction.patterns.is_empty() {
            return Err(TrackerError::config(
                "extraction.patterns",
                "at least one pattern is required",
            ));
        }
        for rule in &extraction.patterns {
            validate_pattern(rule)?;
        }

        let mut feed_ids = HashSet::new();
        for feed in &self.feeds {
            if feed.id.trim().is_empty() {
                return Err(TrackerError::config("feeds", "feed ids must not be blank"));
            }
            if !feed_ids.insert(feed.id.as_str()) {
                return Err(TrackerError::config(
                    format!("feeds.{}", feed.id),
                    "duplicate feed id",
                ));
            }
        }

        if self.output.filename_pattern.trim().is_empty() {
            return Err(TrackerError::config("output.filename_pattern", "must not be blank"));
        }

        Ok(())
    }

    fn validate_value_ranges(&self) -> Result<()> {
        let ranges = &self.value_ranges.0;
        let mut labels = HashSet::new();
        let mut previous_max: Option<f64> = None;

        for (index, range) in ranges.iter().enumerate() {
            let field = format!("value_ranges[{}]", index);
            if range.label.trim().is_empty() {
                return Err(TrackerError::config(field, "label must not be blank"));
            }
            if range.label == UNDISCLOSED_RANGE || !labels.insert(range.label.as_str()) {
                return Err(TrackerError::config(
                    field,
                    format!("label '{}' is reserved or duplicated", range.label),
                ));
            }
            match range.max {
                Some(max) => {
                    if !max.is_finite() {
                        return Err(TrackerError::config(field, "max must be finite"));
                    }
                    if let Some(prev) = previous_max {
                        if max <= prev {
                            return Err(TrackerError::config(
                                field,
                                format!(
                                    "max {} must be greater than the previous bucket's {}",
                                    max, prev
                                ),
                            ));
                        }
                    }
                    previous_max = Some(max);
                }
                None if index + 1 != ranges.len() => {
                    return Err(TrackerError::config(
                        field,
                        "only the last bucket may be open-ended",
                    ));
                }
                None => {}
            }
        }

        Ok(())
    }
}

fn validate_pattern(rule: &PatternRule) -> Result<()> {
    let field = format!("extraction.patterns.{}", rule.name);
    let regex = Regex::new(&expand_pattern(&rule.pattern))
        .map_err(|e| TrackerError::config(field.clone(), format!("does not compile: {}", e)))?;

    // captures_len counts the implicit whole-match group
    let groups = regex.captures_len() - 1;
    let mut referenced = vec![rule.target_group];
    referenced.extend(rule.buyer_group);
    if let Some(bad) = referenced.iter().find(|g| **g == 0 || **g > groups) {
        return Err(TrackerError::config(
            field,
            format!("group {} does not exist (pattern has {} groups)", bad, groups),
        ));
    }
    if rule.buyer_group == Some(rule.target_group) {
        return Err(TrackerError::config(field, "buyer and target must use different groups"));
    }

    Ok(())
}

fn validate_keywords(field: &str, keywords: &[String]) -> Result<()> {
    if keywords.is_empty() {
        return Err(TrackerError::config(field, "keyword list must not be empty"));
    }
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(TrackerError::config(field, "keywords must not be blank"));
    }
    Ok(())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
