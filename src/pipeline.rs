// src/pipeline.rs
//! One pass of collect → enrich → classify → deduplicate → notify.
//!
//! Every stage degrades instead of failing: a dead source contributes nothing,
//! a failed enrichment is treated as absent, a failed store write means nothing
//! is reported as new this run (so it is reported next run instead).

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, gauge};
use std::collections::HashMap;

use crate::classify::RelevanceClassifier;
use crate::config::Settings;
use crate::enrich::{MetadataEnricher, ReadmeEnricher};
use crate::metrics::{FETCH_ERRORS, ITEMS_FETCHED, ITEMS_NOVEL, LAST_RUN_TS, NOTIFICATIONS_SENT};
use crate::models::{ClassifiedRepository, Metadata, Origin, Repository, Story, TrendItem};
use crate::notify::{notifier_from_settings, Notifier};
use crate::sources::{GitHubTrendingSource, HackerNewsSource, Source};
use crate::store::{store_from_settings, TrendStore};

pub type RepoSource = Box<dyn Source<Record = Repository>>;
pub type StorySource = Box<dyn Source<Record = Story>>;

/// What a run did. `novel` is exactly what was handed to the notifier.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched_repos: usize,
    pub fetched_stories: usize,
    pub relevant_repos: usize,
    pub total_items: usize,
    pub novel: Vec<TrendItem>,
    pub notified: bool,
}

pub struct Pipeline {
    pub repo_source: RepoSource,
    pub story_source: StorySource,
    pub enricher: Box<dyn MetadataEnricher>,
    pub classifier: RelevanceClassifier,
    pub store: Box<dyn TrendStore>,
    pub notifier: Box<dyn Notifier>,
    /// Discussion items kept per run.
    pub story_cap: usize,
}

impl Pipeline {
    /// Production wiring from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let repo_source = GitHubTrendingSource::new(
            settings.github_since,
            settings.github_language.clone(),
            settings.http_timeout,
        )?;
        let story_source = HackerNewsSource::new(settings.hn_fetch_limit, settings.http_timeout)?;
        let enricher = ReadmeEnricher::new(settings.http_timeout, settings.github_token.clone())?;

        Ok(Self {
            repo_source: Box::new(repo_source),
            story_source: Box::new(story_source),
            enricher: Box::new(enricher),
            classifier: RelevanceClassifier::from_settings(settings)?,
            store: store_from_settings(settings)?,
            notifier: notifier_from_settings(settings)?,
            story_cap: settings.hn_notify_cap,
        })
    }

    pub async fn run_once(&self) -> RunReport {
        let mut report = RunReport::default();

        let (repos, stories) = tokio::join!(
            fetch_or_empty(self.repo_source.as_ref()),
            fetch_or_empty(self.story_source.as_ref())
        );
        report.fetched_repos = repos.len();
        report.fetched_stories = stories.len();

        let classified = self.classify_repositories(&repos).await;
        report.relevant_repos = classified.len();

        let mut items: Vec<TrendItem> = classified.into_iter().map(convert_repository).collect();
        items.extend(stories.into_iter().take(self.story_cap).map(convert_story));
        report.total_items = items.len();

        report.novel = self.deduplicate(&items).await;
        counter!(ITEMS_NOVEL).increment(report.novel.len() as u64);

        if report.novel.is_empty() {
            tracing::info!("no new items");
        } else if !self.notifier.is_configured() {
            tracing::warn!(notifier = self.notifier.name(), "notifier not configured, skipping");
        } else {
            report.notified = self.notifier.send(&report.novel).await;
            if report.notified {
                counter!(NOTIFICATIONS_SENT).increment(1);
            }
        }

        gauge!(LAST_RUN_TS).set(Utc::now().timestamp() as f64);
        tracing::info!(
            repos = report.fetched_repos,
            stories = report.fetched_stories,
            relevant = report.relevant_repos,
            total = report.total_items,
            novel = report.novel.len(),
            notified = report.notified,
            "pipeline run complete"
        );
        report
    }

    async fn classify_repositories(&self, repos: &[Repository]) -> Vec<ClassifiedRepository> {
        if repos.is_empty() {
            return Vec::new();
        }
        let names: Vec<String> = repos.iter().map(|r| r.name.clone()).collect();
        let enrichment = if self.classifier.is_configured() {
            self.enricher.fetch_many(&names).await
        } else {
            HashMap::new()
        };
        self.classifier.classify(repos, &enrichment).await
    }

    async fn deduplicate(&self, items: &[TrendItem]) -> Vec<TrendItem> {
        if items.is_empty() {
            return Vec::new();
        }
        if !self.store.is_configured() {
            tracing::warn!("no store configured, treating every item as new");
            return items.to_vec();
        }
        match self.store.upsert_items(items).await {
            Ok(novel) => novel,
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = ?e, "store upsert failed");
                Vec::new()
            }
        }
    }
}

async fn fetch_or_empty<R: Send>(source: &dyn Source<Record = R>) -> Vec<R> {
    match source.fetch().await {
        Ok(records) => {
            tracing::info!(source = source.name(), count = records.len(), "fetched");
            counter!(ITEMS_FETCHED, "source" => source.name()).increment(records.len() as u64);
            records
        }
        Err(e) => {
            tracing::warn!(source = source.name(), error = ?e, "source fetch failed");
            counter!(FETCH_ERRORS, "source" => source.name()).increment(1);
            Vec::new()
        }
    }
}

pub fn convert_repository(c: ClassifiedRepository) -> TrendItem {
    let repo = c.repository;
    let mut metadata = Metadata::new();
    metadata.insert("stars".into(), repo.stars.into());
    metadata.insert("stars_today".into(), repo.stars_today.into());
    metadata.insert("forks".into(), repo.forks.into());
    if let Some(lang) = &repo.language {
        metadata.insert("language".into(), lang.as_str().into());
    }

    let mut item = TrendItem::new(Origin::GitHub, repo.name.clone(), repo.name, repo.url);
    item.description = repo.description;
    item.metadata = metadata;
    item.relevance_score = Some(c.relevance_score);
    item.summary = Some(c.summary);
    item.matched_interests = c.matched_interests;
    item.code_example = c.code_examples.into_iter().next().map(|e| e.code);
    item.license = c.license;
    item.is_open_source = c.is_open_source;
    item
}

pub fn convert_story(s: Story) -> TrendItem {
    let mut item = TrendItem::new(Origin::HackerNews, s.id.to_string(), s.title, s.url);
    item.description = s.text;
    item.metadata = s.meta;
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CodeExample;

    fn classified() -> ClassifiedRepository {
        ClassifiedRepository {
            repository: Repository {
                name: "acme/agent".into(),
                url: "https://github.com/acme/agent".into(),
                description: Some("agents".into()),
                language: Some("Rust".into()),
                stars: 1200,
                stars_today: 40,
                forks: 12,
            },
            relevance_score: 8,
            summary: "An agent runtime".into(),
            matched_interests: vec!["AI agents".into()],
            license: Some("mit".into()),
            is_open_source: true,
            code_examples: vec![
                CodeExample { language: "bash".into(), code: "cargo install agent".into() },
                CodeExample { language: "rust".into(), code: "fn main() {}".into() },
            ],
        }
    }

    #[test]
    fn repository_conversion_maps_fields() {
        let item = convert_repository(classified());
        assert_eq!(item.source, Origin::GitHub);
        assert_eq!(item.source_id, "acme/agent");
        assert_eq!(item.title, "acme/agent");
        assert_eq!(item.metadata["stars"].as_int(), Some(1200));
        assert_eq!(item.metadata["stars_today"].as_int(), Some(40));
        assert_eq!(item.metadata["language"].to_string(), "Rust");
        assert_eq!(item.code_example.as_deref(), Some("cargo install agent"));
        assert_eq!(item.relevance_score, Some(8));
        assert!(item.is_open_source);
    }

    #[test]
    fn repository_without_language_has_no_language_key() {
        let mut c = classified();
        c.repository.language = None;
        c.code_examples.clear();
        let item = convert_repository(c);
        assert!(!item.metadata.contains_key("language"));
        assert!(item.code_example.is_none());
    }

    #[test]
    fn story_conversion_uses_numeric_id_as_key() {
        let mut meta = Metadata::new();
        meta.insert("points".into(), 99i64.into());
        let item = convert_story(Story {
            id: 4242,
            title: "Show HN: thing".into(),
            url: "https://example.com".into(),
            text: Some("self text".into()),
            meta,
        });
        assert_eq!(item.source, Origin::HackerNews);
        assert_eq!(item.source_id, "4242");
        assert_eq!(item.description.as_deref(), Some("self text"));
        assert_eq!(item.metadata["points"].as_int(), Some(99));
        assert!(item.relevance_score.is_none());
        assert!(item.matched_interests.is_empty());
    }
}
