//! Configuration for the arXiv crawler.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

/// API configuration constants.
pub mod api {
    use std::time::Duration;

    /// Base URL for the arXiv export API.
    pub const BASE_URL: &str = "https://export.arxiv.org";

    /// Query endpoint path, relative to the base URL.
    pub const QUERY_PATH: &str = "api/query";

    /// Results requested per page. Larger pages make the API return 500s.
    pub const PAGE_SIZE: u32 = 200;

    /// Delay between consecutive requests (arXiv asks for 3 seconds).
    pub const REQUEST_DELAY: Duration = Duration::from_secs(3);

    /// Retry attempts for transient failures and empty pages.
    pub const NUM_RETRIES: u32 = 5;

    /// Lower bound of the HTTP retry backoff.
    pub const RETRY_MIN_BACKOFF: Duration = Duration::from_secs(1);

    /// Upper bound of the HTTP retry backoff.
    pub const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(30);

    /// Pause after a category fails before moving on.
    pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

    /// Request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Maximum keepalive connections.
    pub const MAX_KEEPALIVE: usize = 4;

    /// Keepalive expiry.
    pub const KEEPALIVE_EXPIRY: Duration = Duration::from_secs(30);
}

/// Top-level arXiv archives crawled by default.
///
/// Physics is split over several historical archives, so the major ones are
/// listed individually.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "cs", "math", "stat", "q-bio", "q-fin", "eess", "econ", "physics", "cond-mat", "hep-ph",
    "hep-th", "gr-qc", "astro-ph",
];

/// Days window used when neither the CLI nor `config.yaml` sets one.
pub const DEFAULT_DAYS_WINDOW: u32 = 1;

/// File name of the project configuration, relative to the project root.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z-]*(\.[A-Za-z-]+)?$").expect("valid category regex")
});

/// Check that a category looks like an arXiv archive (`cs`) or subject class (`cs.LG`).
#[must_use]
pub fn is_valid_category(category: &str) -> bool {
    CATEGORY_RE.is_match(category)
}

/// Settings section that may carry a `days_window` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaysSetting {
    /// Raw value; integers and numeric strings are both accepted.
    #[serde(default)]
    pub days_window: Option<serde_yaml::Value>,
}

/// The subset of `config.yaml` this crate reads. Other keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Paper-specific settings (takes precedence).
    #[serde(default)]
    pub arxiv_paper_setting: Option<DaysSetting>,

    /// Generic crawler settings.
    #[serde(default)]
    pub crawler: Option<DaysSetting>,
}

impl FileConfig {
    /// Load from a YAML file.
    ///
    /// A missing file is an empty config. An unreadable or unparseable file is
    /// logged and also treated as empty, so a broken config never stops the crawl.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                return Self::default();
            }
        };

        Self::parse(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file");
            Self::default()
        })
    }

    /// Parse YAML text. An empty document is an empty config.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_yaml::from_str(text)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Resolve the days window.
    ///
    /// `arxiv_paper_setting.days_window` wins; `crawler.days_window` is only
    /// consulted when the first key is absent or null. A value that is present
    /// but not numeric falls back to `default`. The result is at least 1.
    #[must_use]
    pub fn resolve_days_window(&self, default: u32) -> u32 {
        let value = self
            .arxiv_paper_setting
            .as_ref()
            .and_then(|s| s.days_window.as_ref())
            .or_else(|| self.crawler.as_ref().and_then(|s| s.days_window.as_ref()));

        let days = value.and_then(coerce_days).unwrap_or_else(|| i64::from(default));
        u32::try_from(days.max(1)).unwrap_or(u32::MAX)
    }
}

/// Interpret a YAML scalar as a whole number of days.
///
/// `.inf` and `.nan` are not numbers of days and yield `None`.
fn coerce_days(value: &serde_yaml::Value) -> Option<i64> {
    match value {
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_yaml::Value::String(s) => s.trim().parse().ok(),
        serde_yaml::Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Crawler configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the arXiv API (overridable for mock servers).
    pub api_url: String,

    /// Categories to crawl, in order.
    pub categories: Vec<String>,

    /// Results requested per page.
    pub page_size: u32,

    /// Delay between consecutive API requests.
    pub request_delay: Duration,

    /// Retry attempts for transient failures and empty pages.
    pub num_retries: u32,

    /// Shortest wait before an HTTP retry.
    pub retry_min_backoff: Duration,

    /// Longest wait before an HTTP retry.
    pub retry_max_backoff: Duration,

    /// Pause after a failed category.
    pub error_backoff: Duration,

    /// Request timeout.
    pub request_timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Project root; `config.yaml` and `archive/` live here.
    pub root: PathBuf,

    /// Explicit days window, bypassing `config.yaml`.
    pub days_override: Option<u32>,

    /// Explicit output file instead of the dated archive path.
    pub output_file: Option<PathBuf>,

    /// Ignore and do not write crawl state; use whole-day windows.
    pub stateless: bool,
}

impl Config {
    /// Create a configuration rooted at `root` with production defaults.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api::BASE_URL.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect(),
            page_size: api::PAGE_SIZE,
            request_delay: api::REQUEST_DELAY,
            num_retries: api::NUM_RETRIES,
            retry_min_backoff: api::RETRY_MIN_BACKOFF,
            retry_max_backoff: api::RETRY_MAX_BACKOFF,
            error_backoff: api::ERROR_BACKOFF,
            request_timeout: api::REQUEST_TIMEOUT,
            connect_timeout: api::CONNECT_TIMEOUT,
            root: root.into(),
            days_override: None,
            output_file: None,
            stateless: false,
        }
    }

    /// Create a test configuration pointing at a mock server, with no delays.
    #[must_use]
    pub fn for_testing(base_url: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            api_url: base_url.to_string(),
            request_delay: Duration::ZERO,
            num_retries: 1,
            retry_min_backoff: Duration::from_millis(1),
            retry_max_backoff: Duration::from_millis(5),
            error_backoff: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..Self::new(root)
        }
    }

    /// Create configuration from environment variables, rooted at the current directory.
    ///
    /// Reads `ARXIV_API_URL` to override the API base URL.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::new(std::env::current_dir()?);
        if let Ok(url) = std::env::var("ARXIV_API_URL") {
            config.api_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Path to `config.yaml`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Path to the `archive/` directory.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    /// Days window for this run: the explicit override, else `config.yaml`.
    #[must_use]
    pub fn days_window(&self) -> u32 {
        match self.days_override {
            Some(days) => days.max(1),
            None => FileConfig::load(&self.config_file()).resolve_days_window(DEFAULT_DAYS_WINDOW),
        }
    }

    /// Check that the configuration can drive a crawl.
    pub fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("invalid API URL '{}': {e}", self.api_url))?;

        if self.categories.is_empty() {
            anyhow::bail!("at least one category is required");
        }
        if let Some(bad) = self.categories.iter().find(|c| !is_valid_category(c)) {
            anyhow::bail!("invalid arXiv category '{bad}'");
        }
        if self.page_size == 0 {
            anyhow::bail!("page size must be positive");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(".")
    }
}
