//! Shared helpers for mock-server tests.
#![allow(dead_code)]

use wiremock::{Match, Request, ResponseTemplate};

/// A feed entry for mocking.
pub struct MockEntry<'a> {
    pub id: &'a str,
    pub published: &'a str,
    pub categories: &'a [&'a str],
}

impl<'a> MockEntry<'a> {
    pub const fn new(id: &'a str, published: &'a str, categories: &'a [&'a str]) -> Self {
        Self { id, published, categories }
    }
}

/// Render an arXiv-shaped Atom feed.
pub fn feed_xml(total: u32, start: u32, entries: &[MockEntry<'_>]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>arXiv Query</title>
  <opensearch:totalResults>{total}</opensearch:totalResults>
  <opensearch:startIndex>{start}</opensearch:startIndex>
  <opensearch:itemsPerPage>{count}</opensearch:itemsPerPage>
"#,
        count = entries.len()
    );

    for entry in entries {
        let primary = entry.categories.first().copied().unwrap_or("cs.AI");
        xml.push_str(&format!(
            r#"  <entry>
    <id>http://arxiv.org/abs/{id}</id>
    <updated>{published}</updated>
    <published>{published}</published>
    <title>Title of
 {id}</title>
    <summary>Abstract of {id}.</summary>
    <author><name>Test Author</name></author>
    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="{primary}" scheme="http://arxiv.org/schemas/atom"/>
"#,
            id = entry.id,
            published = entry.published,
        ));
        for category in entry.categories {
            xml.push_str(&format!(
                "    <category term=\"{category}\" scheme=\"http://arxiv.org/schemas/atom\"/>\n"
            ));
        }
        xml.push_str("  </entry>\n");
    }

    xml.push_str("</feed>\n");
    xml
}

/// 200 response carrying an Atom feed.
pub fn feed_response(total: u32, start: u32, entries: &[MockEntry<'_>]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/atom+xml")
        .set_body_string(feed_xml(total, start, entries))
}

/// Matches queries for one category (`cat:<name>*`).
pub struct CategoryQuery(pub &'static str);

impl Match for CategoryQuery {
    fn matches(&self, request: &Request) -> bool {
        let prefix = format!("cat:{}* ", self.0);
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == "search_query" && v.starts_with(&prefix))
    }
}

/// Value of `search_query` in a recorded request.
pub fn search_query(request: &Request) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "search_query")
        .map(|(_, v)| v.into_owned())
}
