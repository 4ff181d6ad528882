//! Search requests and feed pages.

use std::fmt;

use super::ArxivEntry;
use crate::window::CrawlWindow;

/// Field the arXiv API sorts results by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortCriterion {
    /// Relevance to the query.
    Relevance,
    /// Time of the latest version.
    LastUpdatedDate,
    /// Time of the first version.
    #[default]
    SubmittedDate,
}

impl SortCriterion {
    /// Value of the `sortBy` query parameter.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::LastUpdatedDate => "lastUpdatedDate",
            Self::SubmittedDate => "submittedDate",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest or least relevant first.
    Ascending,
    /// Newest or most relevant first.
    #[default]
    Descending,
}

impl SortOrder {
    /// Value of the `sortOrder` query parameter.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// A search against the arXiv query API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    /// Query in arXiv search syntax.
    pub query: String,

    /// Cap on results; `None` pages through everything the API reports.
    pub max_results: Option<u32>,

    /// Sort field.
    pub sort_by: SortCriterion,

    /// Sort direction.
    pub sort_order: SortOrder,
}

impl Search {
    /// Search with default sorting (newest submissions first) and no cap.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            sort_by: SortCriterion::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// All submissions to `category` (and its subject classes) inside `window`.
    ///
    /// The trailing wildcard makes `cs` cover `cs.AI`, `cs.LG` and so on.
    #[must_use]
    pub fn for_category(category: &str, window: &CrawlWindow) -> Self {
        Self::new(format!(
            "cat:{category}* AND submittedDate:[{} TO {}]",
            window.start_param(),
            window.end_param()
        ))
    }

    /// Limit the number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Change the sort field and direction.
    #[must_use]
    pub const fn sorted(mut self, by: SortCriterion, order: SortOrder) -> Self {
        self.sort_by = by;
        self.sort_order = order;
        self
    }

    /// Query parameters for one page of this search.
    #[must_use]
    pub fn page_params(&self, start: u32, max_results: u32) -> Vec<(String, String)> {
        vec![
            ("search_query".to_string(), self.query.clone()),
            ("id_list".to_string(), String::new()),
            ("start".to_string(), start.to_string()),
            ("max_results".to_string(), max_results.to_string()),
            ("sortBy".to_string(), self.sort_by.as_param().to_string()),
            ("sortOrder".to_string(), self.sort_order.as_param().to_string()),
        ]
    }
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// One page of results from the query API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    /// Total matches reported by OpenSearch.
    pub total_results: u32,

    /// Offset of the first entry on this page.
    pub start_index: u32,

    /// Page size the server applied.
    pub items_per_page: u32,

    /// Entries on this page.
    pub entries: Vec<ArxivEntry>,
}
