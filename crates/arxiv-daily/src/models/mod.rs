//! Data models for arXiv entries, search requests and archived papers.

mod paper;
mod search;

pub use paper::{ArxivAuthor, ArxivEntry, ArxivLink, Paper, SOURCE_ARXIV};
pub use search::{Feed, Search, SortCriterion, SortOrder};
