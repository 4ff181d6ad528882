//! The daily crawl: every category over one window, deduplicated, archived.

use std::path::PathBuf;
use std::pin::pin;

use chrono::{DateTime, Utc};
use futures::StreamExt;

use crate::archive::{default_output_path, write_papers};
use crate::ci::LogGroups;
use crate::client::ArxivClient;
use crate::config::Config;
use crate::error::{CrawlError, CrawlResult};
use crate::models::{ArxivEntry, Paper, Search};
use crate::state::{SeenState, StateStore};
use crate::window::CrawlWindow;

/// Progress is logged every this many new papers within a category.
const PROGRESS_EVERY: usize = 100;

/// Outcome of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    /// Category queried.
    pub category: String,

    /// Papers this category contributed that no earlier category or run had.
    pub new_papers: usize,

    /// Error that ended the category early, if any.
    pub error: Option<String>,
}

impl CategoryReport {
    /// Whether the category ran to completion.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Window that was queried.
    pub window: CrawlWindow,

    /// Per-category results, in crawl order.
    pub categories: Vec<CategoryReport>,

    /// New papers, in the order they were found.
    pub papers: Vec<Paper>,

    /// Where the papers were written; `None` when there were none.
    pub output: Option<PathBuf>,

    /// Newest publication time among the new papers.
    pub latest_published_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    /// Number of new papers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.papers.len()
    }

    /// Categories that ended with an error.
    pub fn failed_categories(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories.iter().filter(|c| !c.succeeded())
    }
}

/// Mutable state of a single run.
struct RunState {
    seen: SeenState,
    papers: Vec<Paper>,
    latest_new: Option<DateTime<Utc>>,
}

impl RunState {
    /// Keep `entry` unless an earlier run or category already produced it.
    fn accept(&mut self, entry: &ArxivEntry) -> bool {
        if !self.seen.insert(entry.short_id()) {
            return false;
        }

        self.latest_new = Some(self.latest_new.map_or(entry.published, |t| t.max(entry.published)));
        self.papers.push(Paper::from_entry(entry));
        true
    }
}

/// Runs the crawl described by a [`Config`].
#[derive(Debug, Clone)]
pub struct Crawler {
    client: ArxivClient,
    config: Config,
    store: StateStore,
    groups: LogGroups,
}

impl Crawler {
    /// Validate the configuration and build the API client.
    pub fn new(config: Config) -> CrawlResult<Self> {
        config.validate().map_err(|e| CrawlError::Config(format!("{e:#}")))?;
        let client = ArxivClient::new(&config).map_err(|e| CrawlError::Config(format!("{e:#}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Use an existing client.
    #[must_use]
    pub fn with_client(config: Config, client: ArxivClient) -> Self {
        let store = StateStore::new(config.archive_dir());
        Self { client, config, store, groups: LogGroups::default() }
    }

    /// Emit GitHub Actions log groups around each step.
    #[must_use]
    pub fn with_log_groups(mut self, groups: LogGroups) -> Self {
        self.groups = groups;
        self
    }

    /// State store used by this crawler.
    #[must_use]
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// Crawl every configured category for the window ending at `now`.
    ///
    /// A failing category is logged and skipped. Only persistence failures
    /// abort the run.
    pub async fn run(&self, now: DateTime<Utc>) -> CrawlResult<CrawlReport> {
        let _step = self.groups.start("Step 1 - fetch arXiv");

        let days = self.config.days_window();
        let (seen, window) = if self.config.stateless {
            (SeenState::default(), CrawlWindow::stateless(now, days))
        } else {
            let seen = self.store.load_seen();
            let last_crawl_at = match seen.latest_published_at {
                Some(_) => None,
                None => self.store.load_last_crawl_at(),
            };
            let window = CrawlWindow::resolve(now, days, seen.latest_published_at, last_crawl_at);
            (seen, window)
        };
        let previous_latest = seen.latest_published_at;

        tracing::info!(window = %window, seen = seen.ids.len(), "Global ingest window");

        let mut run = RunState { seen, papers: Vec::new(), latest_new: None };
        let mut categories = Vec::with_capacity(self.config.categories.len());

        for category in &self.config.categories {
            categories.push(self.crawl_category(category, &window, &mut run).await);
        }

        tracing::info!(total = run.papers.len(), "All categories done");

        let output = if run.papers.is_empty() {
            tracing::warn!("No papers found; check the date range or network");
            None
        } else {
            let path = self
                .config
                .output_file
                .clone()
                .unwrap_or_else(|| default_output_path(&self.config.root, window.archive_date()));
            write_papers(&path, &run.papers)?;
            tracing::info!(path = %path.display(), count = run.papers.len(), "Saved papers");
            Some(path)
        };

        if !self.config.stateless {
            run.seen.latest_published_at = run.latest_new.or(previous_latest);
            self.store.save_seen(&run.seen, now)?;
            self.store.save_last_crawl_at(window.end)?;
        }

        Ok(CrawlReport {
            window,
            categories,
            papers: run.papers,
            output,
            latest_published_at: run.latest_new,
        })
    }

    async fn crawl_category(
        &self,
        category: &str,
        window: &CrawlWindow,
        run: &mut RunState,
    ) -> CategoryReport {
        let _group = self.groups.start(format_args!("Fetch category: {category}"));
        tracing::info!(category, "Fetching category");

        let search = Search::for_category(category, window);
        let mut results = pin!(self.client.results(&search));
        let mut new_papers = 0;

        while let Some(item) = results.next().await {
            match item {
                Ok(entry) => {
                    if run.accept(&entry) {
                        new_papers += 1;
                        if new_papers % PROGRESS_EVERY == 0 {
                            tracing::info!(category, count = new_papers, "Papers fetched so far");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(category, error = %e, new_papers, "Category failed");
                    tokio::time::sleep(self.config.error_backoff).await;
                    return CategoryReport {
                        category: category.to_string(),
                        new_papers,
                        error: Some(e.to_string()),
                    };
                }
            }
        }

        tracing::info!(category, count = new_papers, "Finished category");
        CategoryReport { category: category.to_string(), new_papers, error: None }
    }
}
