//! arXiv Daily
//!
//! Ingest stage of a daily paper digest. Crawls the arXiv query API for every
//! configured category over an incremental time window, drops papers already
//! archived by earlier runs, and writes the day's new papers as JSON for the
//! static site build.
//!
//! # Features
//!
//! - **Incremental**: resumes from the newest archived paper, bounded by a days window
//! - **Polite**: one request at a time, spaced 3 seconds apart, with retries
//! - **Resilient**: a failing category is logged and skipped
//! - **CI-aware**: folds its log into GitHub Actions groups
//!
//! # Example
//!
//! ```no_run
//! use arxiv_daily::{Config, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let report = Crawler::new(config)?.run(chrono::Utc::now()).await?;
//!     println!("{} new papers", report.total());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod ci;
pub mod client;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod state;
pub mod window;

pub use client::ArxivClient;
pub use config::Config;
pub use crawler::{CrawlReport, Crawler};
pub use error::{ClientError, CrawlError, StoreError};
