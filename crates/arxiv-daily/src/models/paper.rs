//! Paper data models: the parsed arXiv entry and the archived record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of [`Paper::source`] for papers crawled from arXiv.
pub const SOURCE_ARXIV: &str = "arxiv";

/// An entry from the arXiv Atom feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivEntry {
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2401.01234v1`.
    pub entry_id: String,

    /// Time of the latest version.
    pub updated: DateTime<Utc>,

    /// Time of the first version.
    pub published: DateTime<Utc>,

    /// Paper title, as served (may contain line breaks).
    pub title: String,

    /// Paper abstract, as served (may contain line breaks).
    pub summary: String,

    /// Authors in feed order.
    pub authors: Vec<ArxivAuthor>,

    /// Author comment (page counts, venue notes).
    pub comment: Option<String>,

    /// Journal reference, if published.
    pub journal_ref: Option<String>,

    /// DOI, if assigned.
    pub doi: Option<String>,

    /// Primary subject class, e.g. `cs.LG`.
    pub primary_category: String,

    /// All subject classes, primary first as served.
    pub categories: Vec<String>,

    /// Related links (abstract page, PDF, DOI).
    pub links: Vec<ArxivLink>,
}

/// An author of an arXiv entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivAuthor {
    /// Display name.
    pub name: String,

    /// Affiliation, when the submitter provided one.
    pub affiliation: Option<String>,
}

/// A `<link>` element of an arXiv entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivLink {
    /// Target URL.
    pub href: String,

    /// Link title (`pdf`, `doi`), if any.
    pub title: Option<String>,

    /// Link relation (`alternate`, `related`).
    pub rel: Option<String>,

    /// MIME type.
    pub content_type: Option<String>,
}

impl ArxivEntry {
    /// Short identifier including the version, e.g. `2401.01234v1` or `hep-th/9901001v2`.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.entry_id.rsplit("arxiv.org/abs/").next().unwrap_or(&self.entry_id)
    }

    /// URL of the PDF, if the feed linked one.
    #[must_use]
    pub fn pdf_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.title.as_deref() == Some("pdf"))
            .map(|l| l.href.as_str())
    }

    /// Author names in feed order.
    #[must_use]
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().map(|a| a.name.clone()).collect()
    }
}

/// A paper as written to the daily archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// arXiv short id with version.
    pub id: String,

    /// Origin of the record (always `arxiv` for now).
    pub source: String,

    /// Title on a single line.
    pub title: String,

    /// Abstract on a single line.
    pub r#abstract: String,

    /// Author names.
    pub authors: Vec<String>,

    /// Primary subject class.
    pub primary_category: String,

    /// All subject classes.
    pub categories: Vec<String>,

    /// First-version timestamp, `YYYY-MM-DD HH:MM:SS+00:00`.
    pub published: String,

    /// PDF link, or the abstract page when no PDF link was served.
    pub link: String,
}

impl Paper {
    /// Build the archive record for a feed entry.
    #[must_use]
    pub fn from_entry(entry: &ArxivEntry) -> Self {
        Self {
            id: entry.short_id().to_string(),
            source: SOURCE_ARXIV.to_string(),
            title: single_line(&entry.title),
            r#abstract: single_line(&entry.summary),
            authors: entry.author_names(),
            primary_category: entry.primary_category.clone(),
            categories: entry.categories.clone(),
            published: entry.published.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
            link: entry.pdf_url().unwrap_or(&entry.entry_id).to_string(),
        }
    }
}

impl From<&ArxivEntry> for Paper {
    fn from(entry: &ArxivEntry) -> Self {
        Self::from_entry(entry)
    }
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ")
}
