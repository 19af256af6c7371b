// tests/metrics.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use trend_sieve::classify::{MockService, RelevanceClassifier};
use trend_sieve::enrich::MetadataEnricher;
use trend_sieve::metrics::Metrics;
use trend_sieve::models::{Enrichment, Metadata, Repository, Story, TrendItem};
use trend_sieve::notify::Notifier;
use trend_sieve::sources::Source;
use trend_sieve::store::MemoryStore;
use trend_sieve::Pipeline;

struct DeadRepos;

#[async_trait]
impl Source for DeadRepos {
    type Record = Repository;
    async fn fetch(&self) -> Result<Vec<Repository>> {
        Err(anyhow!("dns failure"))
    }
    fn name(&self) -> &'static str {
        "github"
    }
}

struct OneStory;

#[async_trait]
impl Source for OneStory {
    type Record = Story;
    async fn fetch(&self) -> Result<Vec<Story>> {
        Ok(vec![Story {
            id: 1,
            title: "t".into(),
            url: "https://example.com".into(),
            text: None,
            meta: Metadata::new(),
        }])
    }
    fn name(&self) -> &'static str {
        "hackernews"
    }
}

struct Nothing;

#[async_trait]
impl MetadataEnricher for Nothing {
    async fn fetch_many(&self, _names: &[String]) -> HashMap<String, Enrichment> {
        HashMap::new()
    }
}

struct Accepting;

#[async_trait]
impl Notifier for Accepting {
    fn is_configured(&self) -> bool {
        true
    }
    async fn send(&self, _items: &[TrendItem]) -> bool {
        true
    }
    fn name(&self) -> &'static str {
        "accepting"
    }
}

// Single test: the recorder is process-global.
#[tokio::test]
async fn run_emits_expected_series_and_textfile() {
    let metrics = Metrics::init().expect("recorder installs once per process");

    let p = Pipeline {
        repo_source: Box::new(DeadRepos),
        story_source: Box::new(OneStory),
        enricher: Box::new(Nothing),
        classifier: RelevanceClassifier::new(
            Arc::new(MockService::returning(json!([]))),
            vec!["LLM".into()],
            6,
            "English",
        ),
        store: Box::new(MemoryStore::new()),
        notifier: Box::new(Accepting),
        story_cap: 10,
    };
    let report = p.run_once().await;
    assert!(report.notified);

    let text = metrics.handle.render();
    for needle in [
        r#"trend_fetch_errors_total{source="github"} 1"#,
        r#"trend_items_fetched_total{source="hackernews"} 1"#,
        "trend_items_novel_total 1",
        "trend_notifications_sent_total 1",
        "trend_pipeline_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing series: {needle}\n{text}");
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trend_sieve.prom");
    metrics.write_textfile(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("trend_items_novel_total"));
}
