use crate::config::{PatternRule, TrackerConfig};
use crate::taxonomy::Taxonomy;
use crate::types::{Article, CandidateDeal, Currency, Result, TrackerError};
use crate::utils::normalize_name;
use crate::utils::text::smart_truncate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Proper-noun phrase: capitalised words, optionally joined by `&`, with an
/// optional lowercase company suffix.
pub const NAME_EXPR: &str =
    r"[A-Z][A-Za-z0-9&'\-]*(?:\s+(?:&\s+)?[A-Z][A-Za-z0-9&'\-]*)*(?:\s+(?:plc|llc|ltd|inc)\b)?";
/// Same phrase, shortest match first.
pub const SHORT_NAME_EXPR: &str =
    r"[A-Z][A-Za-z0-9&'\-]*(?:\s+(?:&\s+)?[A-Z][A-Za-z0-9&'\-]*)*?(?:\s+(?:plc|llc|ltd|inc)\b)?";

// Substrings, so "buy" also covers "buys" and "buyout", "snap" covers "snaps up"
const DEAL_KEYWORDS: &[&str] = &[
    "acqui", "merge", "buy", "bought", "purchase", "takeover", "snap", "sold", "deal",
    "transaction",
];

// A captured name is cut at the first of these
const NAME_STOP_WORDS: &[&str] = &[
    "for", "from", "in", "to", "at", "on", "as", "with", "worth", "amid", "after", "expanding",
    "announced", "completed", "finalized", "finalised", "deal", "says",
];

const LEADING_FILLER: &[&str] = &[
    "the", "breaking", "exclusive", "update", "report", "reports", "today", "yesterday", "news",
    "analysis", "watch",
];

const HEADLINE_MAX_CHARS: usize = 200;
const RATIONALE_MAX_CHARS: usize = 200;

const RUMOR_FACTOR: f64 = 0.8;
const UNDISCLOSED_FACTOR: f64 = 0.9;
const MISSING_PARTY_FACTOR: f64 = 0.7;
const NO_SECTOR_FACTOR: f64 = 0.85;

lazy_static! {
    static ref SYMBOL_VALUE_RE: Regex = Regex::new(
        r"(?i)([£$€])\s?((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)\s?(billion|million|thousand|bn|mn|m|b|k)?\b"
    )
    .unwrap();
    static ref CODE_VALUE_RE: Regex = Regex::new(
        r"(?i)\b(gbp|usd|eur)\s?((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)\s?(billion|million|thousand|bn|mn|m|b|k)?\b"
    )
    .unwrap();
    static ref WORD_VALUE_RE: Regex = Regex::new(
        r"(?i)\b((?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)\s?(billion|million|bn|mn|m)?\s+(pounds?|sterling|dollars?|euros?|gbp|usd|eur)\b"
    )
    .unwrap();
    static ref RATIONALE_RE: Regex = Regex::new(r"(?i)\b(?:to|will|would)\s+[^.]{20,100}").unwrap();
    // "Nordic cybersecurity firm SecureCo": the descriptor's noun names the party
    static ref DESCRIPTOR_RE: Regex = Regex::new(&format!(
        r"^\s+(?:[a-z][a-z0-9\-]*\s+){{0,3}}(?:firm|company|provider|consultancy|specialist|business|start-?up|agency|group)\s+({})",
        NAME_EXPR
    ))
    .unwrap();
    static ref STRATEGIC_RE: Regex = Regex::new(r"(?i)\b(?:strategic|rationale|reason)[^.]{0,200}").unwrap();
}

/// Substitute the name placeholders of a pattern table row.
pub fn expand_pattern(pattern: &str) -> String {
    pattern
        .replace("{short_name}", SHORT_NAME_EXPR)
        .replace("{name}", NAME_EXPR)
}

struct CompiledRule {
    name: String,
    regex: Regex,
    buyer_group: Option<usize>,
    target_group: usize,
    priority: u32,
}

impl CompiledRule {
    fn compile(rule: &PatternRule) -> Result<Self> {
        let regex = Regex::new(&expand_pattern(&rule.pattern)).map_err(|e| {
            TrackerError::config(format!("extraction.patterns.{}", rule.name), e.to_string())
        })?;
        Ok(Self {
            name: rule.name.clone(),
            regex,
            buyer_group: rule.buyer_group,
            target_group: rule.target_group,
            priority: rule.priority,
        })
    }

    fn find(&self, segment: &str) -> Option<PartyMatch> {
        let caps = self.regex.captures(segment)?;
        let target = described_name(segment, &caps, self.target_group)
            .or_else(|| group_name(&caps, Some(self.target_group)))?;
        let buyer = group_name(&caps, self.buyer_group)
            .filter(|buyer| normalize_name(buyer) != normalize_name(&target));
        let start = caps.get(0).map_or(0, |m| m.start());

        Some(PartyMatch {
            rule: self.name.clone(),
            priority: self.priority,
            start,
            buyer,
            target,
        })
    }
}

fn group_name(caps: &Captures<'_>, group: Option<usize>) -> Option<String> {
    let raw = caps.get(group?)?.as_str();
    let cleaned = clean_name(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Name following a descriptor when the capture was only its leading
/// adjective, as in "Nordic cybersecurity firm SecureCo".
fn described_name(segment: &str, caps: &Captures<'_>, group: usize) -> Option<String> {
    let end = caps.get(group)?.end();
    let described = DESCRIPTOR_RE.captures(&segment[end..])?;
    let name = clean_name(described.get(1)?.as_str());
    (!name.is_empty()).then_some(name)
}

/// Trim filler words a proper-noun capture tends to drag along.
pub fn clean_name(raw: &str) -> String {
    let mut words: Vec<&str> = raw.split_whitespace().collect();

    if let Some(cut) = words
        .iter()
        .skip(1)
        .position(|w| NAME_STOP_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.truncate(cut + 1);
    }

    while words.len() > 1 && LEADING_FILLER.contains(&words[0].to_lowercase().as_str()) {
        words.remove(0);
    }

    while let Some(last) = words.last() {
        if NAME_STOP_WORDS.contains(&last.to_lowercase().as_str()) || *last == "&" {
            words.pop();
        } else {
            break;
        }
    }

    if words.len() == 1 && LEADING_FILLER.contains(&words[0].to_lowercase().as_str()) {
        return String::new();
    }

    words
        .join(" ")
        .trim_matches(|c: char| c == '\'' || c == '-')
        .to_string()
}

#[derive(Debug, Clone)]
struct PartyMatch {
    rule: String,
    priority: u32,
    start: usize,
    buyer: Option<String>,
    target: String,
}

impl PartyMatch {
    fn conflicts_with(&self, other: &PartyMatch) -> bool {
        if normalize_name(&self.target) != normalize_name(&other.target) {
            return true;
        }
        match (&self.buyer, &other.buyer) {
            (Some(a), Some(b)) => normalize_name(a) != normalize_name(b),
            _ => false,
        }
    }
}

/// A normalised monetary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MonetaryValue {
    pub expression: String,
    pub millions: f64,
    pub currency: Currency,
}

/// Result of scanning text for deal values.
#[derive(Debug, Default)]
pub struct ValueScan {
    pub value: Option<MonetaryValue>,
    pub failures: Vec<TrackerError>,
}

/// Find the earliest monetary expression that normalises to millions.
/// Expressions that cannot be normalised are reported and skipped.
pub fn scan_value(text: &str) -> ValueScan {
    let mut found: Vec<(usize, String, Option<Currency>, String, Option<String>)> = Vec::new();

    for caps in SYMBOL_VALUE_RE.captures_iter(text) {
        found.push((
            caps.get(0).map_or(0, |m| m.start()),
            caps[0].trim().to_string(),
            Currency::from_symbol(&caps[1]),
            caps[2].to_string(),
            caps.get(3).map(|m| m.as_str().to_string()),
        ));
    }
    for caps in CODE_VALUE_RE.captures_iter(text) {
        found.push((
            caps.get(0).map_or(0, |m| m.start()),
            caps[0].trim().to_string(),
            Currency::from_word(&caps[1]),
            caps[2].to_string(),
            caps.get(3).map(|m| m.as_str().to_string()),
        ));
    }
    for caps in WORD_VALUE_RE.captures_iter(text) {
        found.push((
            caps.get(0).map_or(0, |m| m.start()),
            caps[0].trim().to_string(),
            Currency::from_word(&caps[3]),
            caps[1].to_string(),
            caps.get(2).map(|m| m.as_str().to_string()),
        ));
    }

    found.sort_by_key(|(start, ..)| *start);

    let mut scan = ValueScan::default();
    for (_, expression, currency, number, magnitude) in found {
        match (currency, normalize_amount(&number, magnitude.as_deref())) {
            (Some(currency), Some(millions)) => {
                scan.value = Some(MonetaryValue {
                    expression,
                    millions,
                    currency,
                });
                break;
            }
            _ => scan.failures.push(TrackerError::ValueParseFailure { expression }),
        }
    }

    scan
}

/// Convert a number plus magnitude word into millions.
///
/// Without a magnitude the number is read as whole currency units, which is
/// only trusted for amounts of at least a thousand.
pub fn normalize_amount(number: &str, magnitude: Option<&str>) -> Option<f64> {
    let amount: f64 = number.replace(',', "").parse().ok()?;

    let millions = match magnitude.map(|m| m.to_lowercase()) {
        Some(m) if matches!(m.as_str(), "billion" | "bn" | "b") => amount * 1000.0,
        Some(m) if matches!(m.as_str(), "million" | "mn" | "m") => amount,
        Some(m) if matches!(m.as_str(), "thousand" | "k") => amount / 1000.0,
        Some(_) => return None,
        None if amount >= 1000.0 => amount / 1_000_000.0,
        None => return None,
    };

    if millions.is_finite() && millions > 0.0 {
        Some(millions)
    } else {
        None
    }
}

/// Multiplicative confidence heuristic, always within [0, 1].
pub fn confidence_score(
    lower_text: &str,
    value_disclosed: bool,
    both_parties: bool,
    sector_hit: bool,
) -> f64 {
    let mut score: f64 = 1.0;
    if lower_text.contains("rumor") || lower_text.contains("rumour") {
        score *= RUMOR_FACTOR;
    }
    if !value_disclosed {
        score *= UNDISCLOSED_FACTOR;
    }
    if !both_parties {
        score *= MISSING_PARTY_FACTOR;
    }
    if !sector_hit {
        score *= NO_SECTOR_FACTOR;
    }
    score.clamp(0.0, 1.0)
}

/// First clause explaining why the deal happens, if the article gives one.
pub fn extract_rationale(body: &str, full_text: &str) -> String {
    for source in [body, full_text] {
        for re in [&*RATIONALE_RE, &*STRATEGIC_RE] {
            if let Some(m) = re.find(source) {
                return smart_truncate(m.as_str().trim(), RATIONALE_MAX_CHARS);
            }
        }
    }
    String::new()
}

/// Outcome of extracting one article: at most one candidate plus the
/// recovered problems met on the way.
#[derive(Debug, Default)]
pub struct Extraction {
    pub candidate: Option<CandidateDeal>,
    pub issues: Vec<TrackerError>,
}

/// Ordered pattern matchers behind a single extraction entry point.
pub struct DealExtractor {
    rules: Vec<CompiledRule>,
    excluded_keywords: Vec<String>,
    taxonomy: Arc<Taxonomy>,
}

impl DealExtractor {
    pub fn new(config: &TrackerConfig, taxonomy: Arc<Taxonomy>) -> Result<Self> {
        let mut rules = config
            .extraction
            .patterns
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        rules.sort_by_key(|rule| rule.priority);

        let excluded_keywords = config
            .deal_filters
            .excluded_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        Ok(Self {
            rules,
            excluded_keywords,
            taxonomy,
        })
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    /// Deal keyword present and no excluded keyword present.
    pub fn is_deal_text(&self, lower_text: &str) -> bool {
        let has_deal = DEAL_KEYWORDS.iter().any(|kw| lower_text.contains(kw));
        let has_excluded = self
            .excluded_keywords
            .iter()
            .any(|kw| lower_text.contains(kw.as_str()));
        has_deal && !has_excluded
    }

    pub fn extract(&self, article: &Article) -> Result<Extraction> {
        if article.title.trim().is_empty() && article.body.trim().is_empty() {
            return Err(TrackerError::EmptyArticle {
                url: article.url.clone(),
            });
        }

        let text = article.text();
        let lower = text.to_lowercase();
        let mut extraction = Extraction::default();

        if !self.is_deal_text(&lower) {
            debug!("No deal language in '{}'", article.title);
            return Ok(extraction);
        }

        // The headline is the most reliable statement of who bought whom
        let (chosen, conflicts) = match self
            .match_parties(&article.title)
            .or_else(|| self.match_parties(&article.body))
        {
            Some(found) => found,
            None => {
                debug!("No acquisition phrasing in '{}'", article.title);
                return Ok(extraction);
            }
        };

        if conflicts > 0 {
            let issue = TrackerError::ExtractionAmbiguous {
                url: article.url.clone(),
                candidates: conflicts + 1,
            };
            debug!("{} (kept '{}')", issue, chosen.rule);
            extraction.issues.push(issue);
        }

        let needs_review = chosen.buyer.is_none();
        if needs_review {
            extraction.issues.push(TrackerError::ExtractionIncomplete {
                url: article.url.clone(),
                target: chosen.target.clone(),
            });
        }

        let scan = scan_value(&text);
        extraction.issues.extend(scan.failures);

        let sector_hit = self.taxonomy.has_sector_keyword(&lower);
        let confidence = confidence_score(&lower, scan.value.is_some(), !needs_review, sector_hit);

        debug!(
            "Extracted {:?} -> {} via {} (confidence {:.2})",
            chosen.buyer, chosen.target, chosen.rule, confidence
        );

        extraction.candidate = Some(CandidateDeal {
            id: Uuid::new_v4(),
            feed_id: article.feed_id.clone(),
            source: article.source.clone(),
            headline: smart_truncate(&article.title, HEADLINE_MAX_CHARS),
            buyer: chosen.buyer,
            target: chosen.target,
            value_expression: scan.value.as_ref().map(|v| v.expression.clone()),
            value_millions: scan.value.as_ref().map(|v| v.millions),
            currency: scan.value.as_ref().map(|v| v.currency),
            announced_at: article.published_at,
            url: article.url.clone(),
            confidence,
            matched_pattern: chosen.rule,
            rationale: extract_rationale(&article.body, &text),
            needs_review,
            ambiguous: conflicts > 0,
        });

        Ok(extraction)
    }

    /// Earliest match wins, then pattern priority. Returns the winner and the
    /// number of other matches naming different parties.
    fn match_parties(&self, segment: &str) -> Option<(PartyMatch, usize)> {
        if segment.trim().is_empty() {
            return None;
        }

        let matches: Vec<PartyMatch> =
            self.rules.iter().filter_map(|rule| rule.find(segment)).collect();
        let chosen = matches
            .iter()
            .min_by_key(|m| (m.start, m.priority))?
            .clone();
        let conflicts = matches.iter().filter(|m| chosen.conflicts_with(m)).count();

        Some((chosen, conflicts))
    }
}
