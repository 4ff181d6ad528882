//! Crawl time window resolution.
//!
//! Incremental runs resume from the newest paper seen so far, or from the last
//! crawl, but never look back further than the configured days window.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

/// Timestamp format used inside `submittedDate:[... TO ...]`.
pub const ARXIV_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Where the window start came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    /// Newest published time among previously seen papers.
    LatestPublished,
    /// End of the previous crawl.
    LastCrawl,
    /// No state; `now - days`.
    DaysWindow(u32),
    /// Whole-day window ignoring state.
    Stateless(u32),
}

impl fmt::Display for WindowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestPublished => f.write_str("latest_published_at"),
            Self::LastCrawl => f.write_str("last_crawl_at"),
            Self::DaysWindow(days) => write!(f, "days_window={days}"),
            Self::Stateless(days) => write!(f, "stateless days_window={days}"),
        }
    }
}

/// The submission time range queried for every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
    /// Provenance of `start`, for logging.
    pub source: WindowSource,
}

impl CrawlWindow {
    /// Resolve an incremental window ending at `now`.
    ///
    /// The start is the newest seen publication time, else the last crawl time,
    /// else `now - days`; it is then clamped to no earlier than `now - days`.
    /// The window is always at least one minute long.
    #[must_use]
    pub fn resolve(
        now: DateTime<Utc>,
        days: u32,
        latest_published_at: Option<DateTime<Utc>>,
        last_crawl_at: Option<DateTime<Utc>>,
    ) -> Self {
        let floor = days_before(now, days);

        let (start, source) = match (latest_published_at, last_crawl_at) {
            (Some(latest), _) => (latest, WindowSource::LatestPublished),
            (None, Some(last)) => (last, WindowSource::LastCrawl),
            (None, None) => (floor, WindowSource::DaysWindow(days)),
        };

        let mut start = start.max(floor);
        if start >= now {
            start = now - TimeDelta::minutes(1);
        }

        Self { start, end: now, source }
    }

    /// Whole-day window from 00:00 `days` ago up to 23:59 today.
    #[must_use]
    pub fn stateless(now: DateTime<Utc>, days: u32) -> Self {
        let first_day = days_before(now, days).date_naive();
        let last_day = now.date_naive();
        Self {
            start: day_start(first_day),
            end: day_start(last_day) + TimeDelta::minutes(23 * 60 + 59),
            source: WindowSource::Stateless(days),
        }
    }

    /// Start rendered for the arXiv query.
    #[must_use]
    pub fn start_param(&self) -> String {
        self.start.format(ARXIV_TIMESTAMP_FORMAT).to_string()
    }

    /// End rendered for the arXiv query.
    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.format(ARXIV_TIMESTAMP_FORMAT).to_string()
    }

    /// Date used to name the day's archive directory.
    #[must_use]
    pub fn archive_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

impl fmt::Display for CrawlWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} TO {} ({})", self.start_param(), self.end_param(), self.source)
    }
}

/// `now - days`, saturating at the earliest representable time.
fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
