//! Daily archive output.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::models::Paper;

/// Dated raw output path: `<root>/archive/YYYYMMDD/raw/arxiv_papers_YYYYMMDD.json`.
#[must_use]
pub fn default_output_path(root: &Path, date: NaiveDate) -> PathBuf {
    let day = date.format("%Y%m%d").to_string();
    root.join("archive").join(&day).join("raw").join(format!("arxiv_papers_{day}.json"))
}

/// Write the papers as a pretty-printed JSON array, creating parent directories.
pub fn write_papers(path: &Path, papers: &[Paper]) -> StoreResult<()> {
    write_json(path, papers)
}

/// Write any value as pretty-printed JSON (two-space indent, UTF-8 unescaped).
pub(crate) fn write_json<T>(path: &Path, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    std::fs::write(path, body).map_err(|e| StoreError::io(path, e))
}
