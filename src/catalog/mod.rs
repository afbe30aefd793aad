//! Comparison catalog: an index of named split sets and the sets themselves.
//!
//! Index rows are `name,file`; split-set rows are `name,seconds` where seconds
//! is the segment length as a decimal string. The first row of each file is a
//! header and is discarded. Segments accumulate into cumulative milliseconds.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::TimerConfig;
use crate::error::{SessionError, SessionResult};
use crate::logging::{log, log_load, obj, v_str, Domain, Level};

mod source;

pub use source::{build_source, CatalogSource, FsSource, HttpSource, MemorySource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonEntry {
    pub display_name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComparisonSplit {
    pub name: String,
    pub cumulative_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComparisonMeta {
    pub key: String,
    pub display_name: String,
    pub splits: usize,
    pub final_ms: u64,
    /// Hex SHA-256 of the source text.
    pub fingerprint: String,
}

/// Immutable, ordered reference splits for one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComparisonSplitSet {
    meta: ComparisonMeta,
    splits: Vec<ComparisonSplit>,
}

impl ComparisonSplitSet {
    pub fn meta(&self) -> &ComparisonMeta {
        &self.meta
    }

    pub fn splits(&self) -> &[ComparisonSplit] {
        &self.splits
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Cumulative comparison time at `index`, 0 past the end of the set.
    pub fn cumulative_at(&self, index: usize) -> u64 {
        self.splits.get(index).map(|s| s.cumulative_ms).unwrap_or(0)
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.splits
            .get(index)
            .map(|s| s.name.as_str())
            .filter(|n| !n.is_empty())
    }
}

// Non-empty data rows with their 1-based line numbers, header skipped.
fn data_rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .skip(1)
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

pub fn parse_index(key: &str, text: &str) -> SessionResult<Vec<ComparisonEntry>> {
    let mut out = Vec::new();
    for (line_no, line) in data_rows(text) {
        let mut parts = line.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let file = parts.next().unwrap_or_default();
        if file.is_empty() {
            return Err(SessionError::malformed(key, line_no, "missing file column"));
        }
        out.push(ComparisonEntry {
            display_name: if name.is_empty() { file.to_string() } else { name.to_string() },
            key: file.to_string(),
        });
    }
    Ok(out)
}

/// Largest comparison time accepted, so deltas stay representable as `i64`.
pub const MAX_COMPARISON_MS: u64 = i64::MAX as u64;

/// Seconds as a decimal string to whole milliseconds, rounded.
pub fn parse_seconds_ms(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let ms = (secs * 1000.0).round();
    // i64::MAX rounds up to 2^63 as f64, so this rejects everything at or above it
    if ms >= MAX_COMPARISON_MS as f64 {
        return None;
    }
    Some(ms as u64)
}

pub fn parse_split_set(entry: &ComparisonEntry, text: &str) -> SessionResult<ComparisonSplitSet> {
    let key = entry.key.as_str();
    let mut splits = Vec::new();
    let mut cumulative = 0u64;
    for (line_no, line) in data_rows(text) {
        let mut parts = line.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let raw = parts
            .next()
            .ok_or_else(|| SessionError::malformed(key, line_no, "missing duration column"))?;
        let segment = parse_seconds_ms(raw).ok_or_else(|| {
            SessionError::malformed(key, line_no, format!("bad duration '{}'", raw))
        })?;
        cumulative = cumulative
            .checked_add(segment)
            .filter(|c| *c <= MAX_COMPARISON_MS)
            .ok_or_else(|| {
                SessionError::malformed(key, line_no, "cumulative time out of range")
            })?;
        splits.push(ComparisonSplit {
            name: name.to_string(),
            cumulative_ms: cumulative,
        });
    }
    if splits.is_empty() {
        return Err(SessionError::malformed(key, 1, "no splits"));
    }
    Ok(ComparisonSplitSet {
        meta: ComparisonMeta {
            key: entry.key.clone(),
            display_name: entry.display_name.clone(),
            splits: splits.len(),
            final_ms: cumulative,
            fingerprint: hex::encode(Sha256::digest(text.as_bytes())),
        },
        splits,
    })
}

/// Lazily-listed catalog over a [`CatalogSource`].
pub struct Catalog {
    source: Box<dyn CatalogSource + Send + Sync>,
    index_file: String,
    listing: Option<Vec<ComparisonEntry>>,
}

impl Catalog {
    pub fn new(source: Box<dyn CatalogSource + Send + Sync>, index_file: &str) -> Self {
        Self {
            source,
            index_file: index_file.to_string(),
            listing: None,
        }
    }

    pub fn from_config(cfg: &TimerConfig) -> SessionResult<Self> {
        Ok(Self::new(build_source(&cfg.source)?, &cfg.index_file))
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Index entries, fetched on first call and cached afterwards.
    pub async fn list_comparisons(&mut self) -> SessionResult<&[ComparisonEntry]> {
        if self.listing.is_none() {
            let text = self.source.fetch_text(&self.index_file).await?;
            let entries = parse_index(&self.index_file, &text)?;
            log(
                Level::Debug,
                Domain::Catalog,
                "index_loaded",
                obj(&[
                    ("source", v_str(&self.source.describe())),
                    ("entries", serde_json::json!(entries.len())),
                ]),
            );
            self.listing = Some(entries);
        }
        Ok(self.listing.as_deref().unwrap_or(&[]))
    }

    /// Fetch and parse one set. Matches on file key first, then display name.
    pub async fn load_comparison(&mut self, key: &str) -> SessionResult<ComparisonSplitSet> {
        let entry = {
            let listing = self.list_comparisons().await?;
            listing
                .iter()
                .find(|e| e.key == key)
                .or_else(|| listing.iter().find(|e| e.display_name == key))
                .cloned()
                .ok_or_else(|| SessionError::NotFound(key.to_string()))?
        };
        let text = self.source.fetch_text(&entry.key).await?;
        let set = parse_split_set(&entry, &text)?;
        let meta = set.meta();
        log_load(&meta.key, meta.splits, meta.final_ms, &meta.fingerprint);
        Ok(set)
    }
}
