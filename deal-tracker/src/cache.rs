use crate::types::{FeedCache, Result, TrackerError};
use crate::utils::time::cache_stamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const METADATA_FILE: &str = "feed_metadata.json";
const STAMP_LEN: usize = "YYYYmmdd_HHMMSS".len();

/// Index record for the latest stored payload of one feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub feed_name: String,
    pub safe_name: String,
    pub filepath: PathBuf,
    pub filename: String,
    pub cached_at: String,
    pub size_bytes: u64,
}

/// File-name-safe feed key: alphanumerics, `-` and `_`, lowercased.
pub fn safe_name(feed_name: &str) -> String {
    feed_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Feed payloads saved by an external fetcher, one timestamped XML file per
/// fetch plus a JSON index pointing at the newest file of each feed.
#[derive(Debug, Clone)]
pub struct DirectoryFeedCache {
    dir: PathBuf,
}

impl DirectoryFeedCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store(&self, feed_name: &str, content: &str, at: DateTime<Utc>) -> Result<CacheEntry> {
        let safe = safe_name(feed_name);
        if safe.is_empty() {
            return Err(TrackerError::General(format!(
                "Feed name '{}' has no usable characters",
                feed_name
            )));
        }

        let stamp = cache_stamp(at);
        let filename = format!("{}_{}.xml", safe, stamp);
        let filepath = self.dir.join(&filename);
        fs::write(&filepath, content)?;

        let entry = CacheEntry {
            feed_name: feed_name.to_string(),
            safe_name: safe.clone(),
            filepath,
            filename,
            cached_at: stamp,
            size_bytes: content.len() as u64,
        };

        let mut index = self.read_index()?;
        index.insert(safe, entry.clone());
        self.write_index(&index)?;

        info!("Cached feed {} as {}", feed_name, entry.filename);
        Ok(entry)
    }

    /// Newest payload for a feed: the index entry, then the newest
    /// timestamped file, then a plain `<safe_name>.xml`.
    pub fn latest_path(&self, feed_name: &str) -> Result<Option<PathBuf>> {
        let safe = safe_name(feed_name);
        if safe.is_empty() {
            return Ok(None);
        }

        if let Some(entry) = self.read_index()?.get(&safe) {
            if entry.filepath.is_file() {
                return Ok(Some(entry.filepath.clone()));
            }
            warn!("Index points at missing file {}", entry.filepath.display());
        }

        let mut newest: Option<(String, PathBuf)> = None;
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            let Some(stamp) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| stamp_of(n, &safe))
            else {
                continue;
            };
            if newest.as_ref().map_or(true, |(best, _)| stamp.as_str() > best.as_str()) {
                newest = Some((stamp, path));
            }
        }
        if let Some((_, path)) = newest {
            return Ok(Some(path));
        }

        let plain = self.dir.join(format!("{}.xml", safe));
        Ok(plain.is_file().then_some(plain))
    }

    /// Index entries ordered by safe name.
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.read_index()?.into_values().collect())
    }

    /// Safe names of every loadable feed: indexed ones plus any
    /// `<safe>_<stamp>.xml` or `<safe>.xml` written without an index entry.
    pub fn feed_names(&self) -> Result<BTreeSet<String>> {
        let mut names: BTreeSet<String> = self.read_index()?.into_keys().collect();

        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()).and_then(feed_name_of) {
                names.insert(name);
            }
        }
        Ok(names)
    }

    pub fn load_feed(&self, feed_name: &str) -> Result<Option<String>> {
        match self.latest_path(feed_name)? {
            Some(path) => {
                debug!("Loading {} from {}", feed_name, path.display());
                Ok(Some(fs::read_to_string(path)?))
            }
            None => Ok(None),
        }
    }

    fn read_index(&self) -> Result<BTreeMap<String, CacheEntry>> {
        let path = self.dir.join(METADATA_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_index(&self, index: &BTreeMap<String, CacheEntry>) -> Result<()> {
        let content = serde_json::to_string_pretty(index)?;
        fs::write(self.dir.join(METADATA_FILE), content)?;
        Ok(())
    }
}

impl FeedCache for DirectoryFeedCache {
    fn load(&self, feed_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load_feed(feed_id)?)
    }

    fn cached_feed_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.feed_names()?.into_iter().collect())
    }
}

/// Stamp part of `<safe>_<YYYYmmdd_HHMMSS>.xml`, if the name has that shape.
fn stamp_of(filename: &str, safe: &str) -> Option<String> {
    let stamp = filename
        .strip_prefix(safe)?
        .strip_prefix('_')?
        .strip_suffix(".xml")?;

    let well_formed = stamp.len() == STAMP_LEN
        && stamp
            .char_indices()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
    well_formed.then(|| stamp.to_string())
}

/// Feed key of a payload file name, either stamped or plain.
fn feed_name_of(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".xml")?;
    let name = match stem.len().checked_sub(STAMP_LEN + 1) {
        Some(split) if stem.is_char_boundary(split) => {
            let (prefix, rest) = stem.split_at(split);
            match rest.strip_prefix('_') {
                Some(_) if stamp_of(filename, prefix).is_some() => prefix,
                _ => stem,
            }
        }
        _ => stem,
    };
    (!name.is_empty() && safe_name(name) == name).then(|| name.to_string())
}
