use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

/// A feed the run expects to find in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl FeedSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

// Object style note:
// Fetching is done by something outside this workspace (a browser tool, curl,
// a cron job). By the time a run starts the payloads already sit in a cache,
// so the core only ever reads through this trait and never touches the network.

pub trait FeedCache {
    /// Raw feed payload for `feed_id`, `None` when nothing was cached for it.
    fn load(&self, feed_id: &str) -> Result<Option<String>>;

    /// Identifiers of every feed currently held by the cache.
    fn cached_feed_ids(&self) -> Result<Vec<String>>;
}

/// One named table of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub title: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

pub trait ReportWriter {
    /// Short name used on the command line, e.g. `csv`.
    fn format_name(&self) -> &'static str;

    /// Writes `workbook` at `destination` and returns the path actually written.
    fn write(&self, workbook: &Workbook, destination: &Path) -> Result<PathBuf>;
}
