// src/store/supabase.rs
//! Supabase (PostgREST) backed store, table `trend_items`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::time::Duration;

use super::{window_start, TrendStore};
use crate::models::{StoredItem, TrendItem};
use crate::sources::USER_AGENT;

pub const TABLE: &str = "trend_items";

pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
}

#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    item: &'a TrendItem,
    last_seen_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_seen_at: Option<DateTime<Utc>>,
}

impl SupabaseStore {
    pub fn new(url: &str, key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key).context("invalid SUPABASE_KEY")?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}")).context("invalid SUPABASE_KEY")?,
        );
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("building supabase http client")?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{TABLE}", url.trim_end_matches('/')),
        })
    }

    fn key_filter(item: &TrendItem) -> [(&'static str, String); 2] {
        [
            ("source", format!("eq.{}", item.source.as_str())),
            ("source_id", format!("eq.{}", item.source_id)),
        ]
    }

    async fn exists(&self, item: &TrendItem) -> Result<bool> {
        let rows: Vec<serde_json::Value> = self
            .client
            .get(&self.table_url)
            .query(&[("select", "first_seen_at")])
            .query(&Self::key_filter(item))
            .send()
            .await
            .context("supabase select")?
            .error_for_status()
            .context("supabase select non-2xx")?
            .json()
            .await
            .context("supabase select body")?;
        Ok(!rows.is_empty())
    }

    async fn update(&self, item: &TrendItem, now: DateTime<Utc>) -> Result<()> {
        let row = Row {
            item,
            last_seen_at: now,
            first_seen_at: None,
        };
        self.client
            .patch(&self.table_url)
            .query(&Self::key_filter(item))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .context("supabase update")?
            .error_for_status()
            .context("supabase update non-2xx")?;
        Ok(())
    }

    async fn insert(&self, item: &TrendItem, now: DateTime<Utc>) -> Result<()> {
        let row = Row {
            item,
            last_seen_at: now,
            first_seen_at: Some(now),
        };
        self.client
            .post(&self.table_url)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .context("supabase insert")?
            .error_for_status()
            .context("supabase insert non-2xx")?;
        Ok(())
    }

    /// `Ok(true)` when the item was inserted as new.
    async fn upsert_one(&self, item: &TrendItem, now: DateTime<Utc>) -> Result<bool> {
        if self.exists(item).await? {
            self.update(item, now).await?;
            Ok(false)
        } else {
            self.insert(item, now).await?;
            Ok(true)
        }
    }
}

#[async_trait]
impl TrendStore for SupabaseStore {
    /// Items are written one by one; an item whose write fails is logged and
    /// left out of the novel set so a later run reports it again.
    async fn upsert_items(&self, items: &[TrendItem]) -> Result<Vec<TrendItem>> {
        let now = Utc::now();
        let mut novel = Vec::new();
        for item in items {
            match self.upsert_one(item, now).await {
                Ok(true) => {
                    tracing::info!(source = %item.source, source_id = %item.source_id, "new item");
                    novel.push(item.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        source = %item.source,
                        source_id = %item.source_id,
                        error = ?e,
                        "supabase upsert failed"
                    );
                }
            }
        }
        Ok(novel)
    }

    async fn recent_items(&self, days: u32, limit: usize) -> Result<Vec<StoredItem>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "first_seen_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(since) = window_start(Utc::now(), days) {
            let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
            query.push(("first_seen_at", format!("gte.{since}")));
        }
        let rows = self
            .client
            .get(&self.table_url)
            .query(&query)
            .send()
            .await
            .context("supabase recent")?
            .error_for_status()
            .context("supabase recent non-2xx")?
            .json()
            .await
            .context("supabase recent body")?;
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
