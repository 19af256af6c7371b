// src/sources/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{Metadata, Story};
use crate::sources::{Source, USER_AGENT};
use crate::text::normalize_text;

pub const HN_API_BASE: &str = "https://hacker-news.firebaseio.com";
pub const HN_ITEM_PERMALINK: &str = "https://news.ycombinator.com/item?id=";

/// Item shape of the Firebase API; everything optional because deleted and
/// dead items come back sparse.
#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    by: Option<String>,
    time: Option<i64>,
}

pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl HackerNewsSource {
    pub fn new(limit: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building hackernews http client")?;
        Ok(Self {
            client,
            base_url: HN_API_BASE.to_string(),
            limit,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `None` on any failure; a single bad item never fails the batch.
    async fn fetch_item(&self, id: u64) -> Option<HnItem> {
        let url = format!("{}/v0/item/{id}.json", self.base_url);
        let resp = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(source = "hackernews", id, status = %r.status(), "item fetch non-2xx");
                return None;
            }
            Err(e) => {
                tracing::warn!(source = "hackernews", id, error = ?e, "item fetch failed");
                return None;
            }
        };
        // `null` for deleted items deserializes to None.
        match resp.json::<Option<HnItem>>().await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(source = "hackernews", id, error = ?e, "item parse failed");
                None
            }
        }
    }
}

#[async_trait]
impl Source for HackerNewsSource {
    type Record = Story;

    async fn fetch(&self) -> Result<Vec<Story>> {
        let url = format!("{}/v0/topstories.json", self.base_url);
        let ids: Vec<u64> = self
            .client
            .get(&url)
            .send()
            .await
            .context("hackernews topstories get()")?
            .error_for_status()
            .context("hackernews topstories non-2xx")?
            .json()
            .await
            .context("parsing hackernews topstories")?;

        let wanted: Vec<u64> = ids.into_iter().take(self.limit).collect();
        let items = join_all(wanted.iter().map(|id| self.fetch_item(*id))).await;

        Ok(items.into_iter().flatten().filter_map(into_story).collect())
    }

    fn name(&self) -> &'static str {
        "hackernews"
    }
}

fn into_story(item: HnItem) -> Option<Story> {
    if item.kind.as_deref() != Some("story") {
        return None;
    }
    let url = item
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("{HN_ITEM_PERMALINK}{}", item.id));

    let mut meta = Metadata::new();
    meta.insert("points".into(), item.score.unwrap_or(0).into());
    meta.insert("comments".into(), item.descendants.unwrap_or(0).into());
    meta.insert("author".into(), item.by.unwrap_or_default().into());
    meta.insert("time".into(), item.time.unwrap_or(0).into());

    Some(Story {
        id: item.id,
        title: item.title.unwrap_or_default(),
        url,
        text: item
            .text
            .as_deref()
            .map(normalize_text)
            .filter(|t| !t.is_empty()),
        meta,
    })
}
