//! Integration tests against the live arXiv API.
//!
//! Run with: `cargo test --features integration -- --nocapture`

#![cfg(feature = "integration")]

use futures::TryStreamExt;

use arxiv_daily::client::ArxivClient;
use arxiv_daily::config::Config;
use arxiv_daily::models::{ArxivEntry, Search, SortCriterion, SortOrder};

fn create_client() -> ArxivClient {
    ArxivClient::new(&Config::default()).expect("Failed to create client")
}

#[tokio::test]
async fn test_recent_cs_submissions() {
    let client = create_client();
    let search = Search::new("cat:cs.LG").with_max_results(5);

    let entries: Vec<ArxivEntry> = client.results(&search).try_collect().await.expect("Search should succeed");

    assert_eq!(entries.len(), 5);
    for entry in &entries {
        assert!(entry.short_id().contains('v'), "short id carries a version: {}", entry.short_id());
        assert!(!entry.categories.is_empty());
        println!("{} {}", entry.short_id(), entry.title.replace('\n', " "));
    }
}

#[tokio::test]
async fn test_known_paper_by_title() {
    let client = create_client();
    let search = Search::new("ti:\"Attention Is All You Need\" AND au:Vaswani")
        .with_max_results(3)
        .sorted(SortCriterion::Relevance, SortOrder::Descending);

    let feed = client.fetch_page(&search, 0, 3).await.expect("Query should succeed");

    assert!(feed.total_results >= 1);
    assert!(feed.entries.iter().any(|e| e.short_id().starts_with("1706.03762")));
}
