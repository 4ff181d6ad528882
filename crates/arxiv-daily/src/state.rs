//! Crawl state persisted between runs under `archive/`.
//!
//! Two files are kept:
//! - `crawl_state.json`: when the previous crawl ended
//! - `arxiv_seen.json`: every id already archived, plus the newest publication time
//!
//! Loading never fails: a missing or damaged file reads as empty state, which
//! only widens the next window back to the configured days.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::archive::write_json;
use crate::error::StoreResult;

/// File holding the end time of the previous crawl.
pub const CRAWL_STATE_FILE: &str = "crawl_state.json";

/// File holding the ids seen by previous crawls.
pub const SEEN_IDS_FILE: &str = "arxiv_seen.json";

/// Ids archived by previous runs and the newest publication time among them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenState {
    /// Short ids, kept sorted.
    pub ids: BTreeSet<String>,

    /// Newest `published` time of any archived paper.
    pub latest_published_at: Option<DateTime<Utc>>,
}

impl SeenState {
    /// Whether `id` was archived before.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an id. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }
}

#[derive(Serialize)]
struct CrawlStateFile {
    last_crawl_at: String,
}

#[derive(Serialize)]
struct SeenStateFile<'a> {
    updated_at: String,
    latest_published_at: String,
    ids: &'a BTreeSet<String>,
}

/// Reads and writes the state files in one directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Store rooted at `dir` (normally `<root>/archive`).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the state files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `crawl_state.json`.
    #[must_use]
    pub fn crawl_state_path(&self) -> PathBuf {
        self.dir.join(CRAWL_STATE_FILE)
    }

    /// Path of `arxiv_seen.json`.
    #[must_use]
    pub fn seen_path(&self) -> PathBuf {
        self.dir.join(SEEN_IDS_FILE)
    }

    /// End time of the previous crawl, if recorded.
    #[must_use]
    pub fn load_last_crawl_at(&self) -> Option<DateTime<Utc>> {
        let payload = read_json(&self.crawl_state_path())?;
        payload.get("last_crawl_at").and_then(Value::as_str).and_then(parse_timestamp)
    }

    /// Record the end time of this crawl.
    pub fn save_last_crawl_at(&self, at: DateTime<Utc>) -> StoreResult<()> {
        let payload = CrawlStateFile { last_crawl_at: format_timestamp(at) };
        write_json(&self.crawl_state_path(), &payload)
    }

    /// Ids seen by previous crawls.
    #[must_use]
    pub fn load_seen(&self) -> SeenState {
        let Some(payload) = read_json(&self.seen_path()) else {
            return SeenState::default();
        };

        let ids = payload
            .get("ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| match id {
                        Value::String(s) => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let latest_published_at =
            payload.get("latest_published_at").and_then(Value::as_str).and_then(parse_timestamp);

        SeenState { ids, latest_published_at }
    }

    /// Persist the seen ids; `now` is recorded as `updated_at`.
    pub fn save_seen(&self, seen: &SeenState, now: DateTime<Utc>) -> StoreResult<()> {
        let payload = SeenStateFile {
            updated_at: format_timestamp(now),
            latest_published_at: seen.latest_published_at.map(format_timestamp).unwrap_or_default(),
            ids: &seen.ids,
        };
        write_json(&self.seen_path(), &payload)
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read state file");
            return None;
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed state file");
            None
        }
    }
}

/// Render a timestamp as RFC 3339 with a `+00:00` offset.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Parse an ISO 8601 timestamp, normalising to UTC.
///
/// Accepts a `Z` suffix, numeric offsets, a space instead of `T`, and bare
/// dates. Values without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
