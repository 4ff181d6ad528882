//! Atom feed parsing for arXiv query responses.
//!
//! Elements are matched by local name, so the `atom`, `opensearch` and
//! `arxiv` namespace prefixes do not matter.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ClientError, ClientResult};
use crate::models::{ArxivAuthor, ArxivEntry, ArxivLink, Feed};

/// Marker in the entry id of the error entry arXiv returns for bad queries.
const API_ERROR_MARKER: &str = "/api/errors";

/// Parse one page of an arXiv Atom response.
pub fn parse_feed(xml: &str) -> ClientResult<Feed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut entry: Option<EntryBuilder> = None;
    let mut author: Option<ArxivAuthor> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                match name.as_str() {
                    "entry" => entry = Some(EntryBuilder::default()),
                    "author" if entry.is_some() => {
                        author = Some(ArxivAuthor { name: String::new(), affiliation: None });
                    }
                    _ => {}
                }
                if let Some(builder) = entry.as_mut() {
                    builder.attributes(&name, &e)?;
                }
                text.clear();
            }
            Event::Empty(e) => {
                if let Some(builder) = entry.as_mut() {
                    builder.attributes(&local_name(e.local_name().as_ref()), &e)?;
                }
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) => {
                let name = local_name(e.local_name().as_ref());
                let value = std::mem::take(&mut text);

                if name == "entry" {
                    if let Some(builder) = entry.take() {
                        feed.entries.push(builder.build()?);
                    }
                    continue;
                }

                match (entry.as_mut(), name.as_str()) {
                    (None, "totalResults") => feed.total_results = parse_count(&name, &value)?,
                    (None, "startIndex") => feed.start_index = parse_count(&name, &value)?,
                    (None, "itemsPerPage") => feed.items_per_page = parse_count(&name, &value)?,
                    (None, _) => {}
                    (Some(builder), "author") => {
                        if let Some(a) = author.take() {
                            builder.authors.push(a);
                        }
                    }
                    (Some(_), "name") if author.is_some() => {
                        if let Some(a) = author.as_mut() {
                            a.name = value.trim().to_string();
                        }
                    }
                    (Some(_), "affiliation") if author.is_some() => {
                        if let Some(a) = author.as_mut() {
                            a.affiliation = Some(value.trim().to_string());
                        }
                    }
                    (Some(builder), other) => builder.text(other, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_count(element: &str, value: &str) -> ClientResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::feed(format!("<{element}> is not a count: '{value}'")))
}

fn parse_timestamp(element: &str, value: &str) -> ClientResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClientError::feed(format!("<{element}> '{value}': {e}")))
}

fn attribute(e: &BytesStart<'_>, key: &str) -> ClientResult<Option<String>> {
    match e.try_get_attribute(key).map_err(quick_xml::Error::from)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Fields collected while inside an `<entry>`.
#[derive(Debug, Default)]
struct EntryBuilder {
    id: Option<String>,
    updated: Option<String>,
    published: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    authors: Vec<ArxivAuthor>,
    comment: Option<String>,
    journal_ref: Option<String>,
    doi: Option<String>,
    primary_category: Option<String>,
    categories: Vec<String>,
    links: Vec<ArxivLink>,
}

impl EntryBuilder {
    /// Record attribute-only elements (`link`, `category`, `primary_category`).
    fn attributes(&mut self, name: &str, e: &BytesStart<'_>) -> ClientResult<()> {
        match name {
            "link" => {
                if let Some(href) = attribute(e, "href")? {
                    self.links.push(ArxivLink {
                        href,
                        title: attribute(e, "title")?,
                        rel: attribute(e, "rel")?,
                        content_type: attribute(e, "type")?,
                    });
                }
            }
            "category" => {
                if let Some(term) = attribute(e, "term")? {
                    self.categories.push(term);
                }
            }
            "primary_category" => self.primary_category = attribute(e, "term")?,
            _ => {}
        }
        Ok(())
    }

    /// Record a text element.
    fn text(&mut self, name: &str, value: String) {
        let slot = match name {
            "id" => &mut self.id,
            "updated" => &mut self.updated,
            "published" => &mut self.published,
            "title" => &mut self.title,
            "summary" => &mut self.summary,
            "comment" => &mut self.comment,
            "journal_ref" => &mut self.journal_ref,
            "doi" => &mut self.doi,
            _ => return,
        };
        *slot = Some(value);
    }

    fn build(self) -> ClientResult<ArxivEntry> {
        let entry_id = self.id.ok_or_else(|| ClientError::feed("entry without <id>"))?;

        if entry_id.contains(API_ERROR_MARKER) {
            let message = self.summary.unwrap_or_else(|| entry_id.clone());
            return Err(ClientError::Api(message.trim().to_string()));
        }

        let missing = |field: &str| ClientError::feed(format!("entry {entry_id} without <{field}>"));
        let published = self.published.as_deref().ok_or_else(|| missing("published"))?;
        let published = parse_timestamp("published", published)?;
        let updated = match self.updated.as_deref() {
            Some(updated) => parse_timestamp("updated", updated)?,
            None => published,
        };

        let primary_category = self
            .primary_category
            .or_else(|| self.categories.first().cloned())
            .ok_or_else(|| missing("arxiv:primary_category"))?;

        Ok(ArxivEntry {
            updated,
            published,
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            authors: self.authors,
            comment: self.comment,
            journal_ref: self.journal_ref,
            doi: self.doi,
            primary_category,
            categories: self.categories,
            links: self.links,
            entry_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <id>https://arxiv.org/api/abc</id>
  <title>arXiv Query: search_query=cat:cs*</title>
  <updated>2024-03-10T00:00:00Z</updated>
  <link href="https://arxiv.org/api/query?search_query=cat:cs*" rel="self" type="application/atom+xml"/>
  <opensearch:itemsPerPage>200</opensearch:itemsPerPage>
  <opensearch:totalResults>1</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <entry>
    <id>http://arxiv.org/abs/2403.01234v2</id>
    <title>Sparse Attention
  &amp; Friends</title>
    <updated>2024-03-09T17:00:00Z</updated>
    <link href="http://arxiv.org/abs/2403.01234v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2403.01234v2" rel="related" type="application/pdf"/>
    <summary>We study sparse
attention.</summary>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="stat.ML" scheme="http://arxiv.org/schemas/atom"/>
    <published>2024-03-08T12:30:00Z</published>
    <arxiv:primary_category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <arxiv:comment>12 pages</arxiv:comment>
    <author>
      <name>Ada Lovelace</name>
      <arxiv:affiliation>Analytical Engines Ltd</arxiv:affiliation>
    </author>
    <author>
      <name>Alan Turing</name>
    </author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_metadata_and_entry() {
        let feed = parse_feed(FEED).unwrap();
        assert_eq!(feed.total_results, 1);
        assert_eq!(feed.start_index, 0);
        assert_eq!(feed.items_per_page, 200);
        assert_eq!(feed.entries.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.short_id(), "2403.01234v2");
        assert_eq!(entry.title, "Sparse Attention\n  & Friends");
        assert_eq!(entry.summary, "We study sparse\nattention.");
        assert_eq!(entry.primary_category, "cs.LG");
        assert_eq!(entry.categories, vec!["cs.LG", "stat.ML"]);
        assert_eq!(entry.comment.as_deref(), Some("12 pages"));
        assert_eq!(entry.pdf_url(), Some("http://arxiv.org/pdf/2403.01234v2"));
        assert_eq!(entry.authors.len(), 2);
        assert_eq!(entry.authors[0].affiliation.as_deref(), Some("Analytical Engines Ltd"));
        assert_eq!(entry.authors[1].affiliation, None);
        assert_eq!(entry.published.to_rfc3339(), "2024-03-08T12:30:00+00:00");
    }

    #[test]
    fn test_parse_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <title>empty</title>
  <opensearch:totalResults>0</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <opensearch:itemsPerPage>0</opensearch:itemsPerPage>
</feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.total_results, 0);
        assert!(feed.entries.is_empty());
    }

    #[test]
    fn test_parse_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "incorrect id format for 1234"));
    }

    #[test]
    fn test_bad_timestamp_is_feed_error() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2403.00001v1</id>
    <published>yesterday</published>
    <category term="cs.AI"/>
  </entry>
</feed>"#;
        assert!(matches!(parse_feed(xml), Err(ClientError::Feed(_))));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_feed("<feed><entry></feed>").is_err());
    }
}
