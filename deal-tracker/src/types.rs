use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;
// Boundary types live in the interfaces crate
pub use interfaces::{FeedCache, FeedSpec, ReportWriter, Sheet, Workbook};

pub const UNCLASSIFIED_SECTOR: &str = "Unclassified";
pub const UNKNOWN_GEOGRAPHY: &str = "Unknown";
pub const UNDISCLOSED_RANGE: &str = "Undisclosed";

/// One news item read from a cached feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub feed_id: String,
    pub source: String,
    pub guid: Option<String>,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
}

impl Article {
    /// Title and body joined the way every text scan sees them.
    pub fn text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, self.body)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "£" => Some(Currency::Gbp),
            "$" => Some(Currency::Usd),
            "€" => Some(Currency::Eur),
            _ => None,
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "gbp" | "pound" | "pounds" | "sterling" => Some(Currency::Gbp),
            "usd" | "dollar" | "dollars" => Some(Currency::Usd),
            "eur" | "euro" | "euros" => Some(Currency::Eur),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A hypothesised transaction pulled out of a single article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDeal {
    pub id: Uuid,
    pub feed_id: String,
    pub source: String,
    pub headline: String,
    pub buyer: Option<String>,
    pub target: String,
    pub value_expression: Option<String>,
    pub value_millions: Option<f64>,
    pub currency: Option<Currency>,
    pub announced_at: DateTime<Utc>,
    pub url: String,
    pub confidence: f64,
    pub matched_pattern: String,
    pub rationale: String,
    /// Set when only the target could be identified.
    pub needs_review: bool,
    /// Set when several patterns proposed different parties.
    pub ambiguous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuyerType {
    #[serde(rename = "PE")]
    PrivateEquity,
    Strategic,
    Unknown,
}

impl fmt::Display for BuyerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuyerType::PrivateEquity => "PE",
            BuyerType::Strategic => "Strategic",
            BuyerType::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// A candidate enriched with buyer type, sector, technology and geography tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedDeal {
    pub candidate: CandidateDeal,
    pub buyer_type: BuyerType,
    /// Primary sector, `Unclassified` when nothing matched.
    pub sector: String,
    /// Every sector with a keyword hit, in taxonomy order.
    pub sectors: Vec<String>,
    pub technologies: BTreeSet<String>,
    /// Primary region, `Unknown` when nothing matched.
    pub geography: String,
    /// Every region mentioned in the article, in mapping order.
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

/// A deal that survived filtering and deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDeal {
    pub deal: ClassifiedDeal,
    pub value_range: String,
    pub priority: Priority,
    pub alert_reasons: Vec<String>,
}

impl FinalDeal {
    pub fn new(deal: ClassifiedDeal, value_range: String) -> Self {
        Self {
            deal,
            value_range,
            priority: Priority::Low,
            alert_reasons: Vec::new(),
        }
    }

    pub fn candidate(&self) -> &CandidateDeal {
        &self.deal.candidate
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealSet {
    pub deals: Vec<FinalDeal>,
}

impl DealSet {
    pub fn new(deals: Vec<FinalDeal>) -> Self {
        Self { deals }
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FinalDeal> {
        self.deals.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    FeedUnavailable,
    FeedUnreadable,
    ArticleFailed,
    ManualReview,
}

/// A recovered problem surfaced in the run output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWarning {
    pub kind: WarningKind,
    pub feed_id: String,
    pub message: String,
}

impl RunWarning {
    pub fn new(kind: WarningKind, feed_id: &str, error: &TrackerError) -> Self {
        Self {
            kind,
            feed_id: feed_id.to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.feed_id, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Feed unavailable: no cached content for '{feed_id}'")]
    FeedUnavailable { feed_id: String },

    #[error("Feed parse error in '{feed_id}': {reason}")]
    FeedParse { feed_id: String, reason: String },

    #[error("Article has no text: {url}")]
    EmptyArticle { url: String },

    #[error("Ambiguous extraction in {url}: {candidates} conflicting pattern matches")]
    ExtractionAmbiguous { url: String, candidates: usize },

    #[error("Incomplete extraction in {url}: no buyer identified for '{target}'")]
    ExtractionIncomplete { url: String, target: String },

    #[error("Cannot normalize value expression '{expression}'")]
    ValueParseFailure { expression: String },

    #[error("Invalid configuration at '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    #[error("Feed cache error: {0}")]
    Cache(anyhow::Error),

    #[error("Report error: {0}")]
    Report(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl TrackerError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        TrackerError::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
