// src/store/mod.rs
//! Deduplication store: system of record for `(origin, source_id)` keys.

pub mod file;
pub mod memory;
pub mod supabase;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::BTreeMap;

use crate::config::Settings;
use crate::models::{ItemKey, StoredItem, TrendItem};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Persist every item and return, in input order, those whose key was
    /// never stored before. Known keys get their mutable fields overwritten
    /// and `last_seen_at` refreshed; `first_seen_at` never changes.
    async fn upsert_items(&self, items: &[TrendItem]) -> Result<Vec<TrendItem>>;

    /// Items first seen within the last `days`, newest first, at most `limit`.
    async fn recent_items(&self, days: u32, limit: usize) -> Result<Vec<StoredItem>>;

    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// Placeholder when no backend is configured.
pub struct UnconfiguredStore;

#[async_trait]
impl TrendStore for UnconfiguredStore {
    async fn upsert_items(&self, _items: &[TrendItem]) -> Result<Vec<TrendItem>> {
        Ok(Vec::new())
    }
    async fn recent_items(&self, _days: u32, _limit: usize) -> Result<Vec<StoredItem>> {
        Ok(Vec::new())
    }
    fn is_configured(&self) -> bool {
        false
    }
    fn name(&self) -> &'static str {
        "unconfigured"
    }
}

/// Supabase when both credentials exist, else a file store if a path is set.
pub fn store_from_settings(settings: &Settings) -> Result<Box<dyn TrendStore>> {
    if let Some(sb) = &settings.supabase {
        return Ok(Box::new(SupabaseStore::new(&sb.url, &sb.key, settings.http_timeout)?));
    }
    if let Some(path) = &settings.store_path {
        return Ok(Box::new(FileStore::new(path)));
    }
    Ok(Box::new(UnconfiguredStore))
}

/// Shared upsert for the in-process backends. Items are applied in order, so a
/// key repeated within one batch is novel only at its first occurrence.
pub(crate) fn apply_upsert(
    rows: &mut BTreeMap<ItemKey, StoredItem>,
    items: &[TrendItem],
    now: DateTime<Utc>,
) -> Vec<TrendItem> {
    let mut novel = Vec::new();
    for item in items {
        match rows.get_mut(&item.key()) {
            Some(existing) => {
                existing.item = item.clone();
                existing.last_seen_at = now.max(existing.last_seen_at);
            }
            None => {
                rows.insert(
                    item.key(),
                    StoredItem {
                        item: item.clone(),
                        first_seen_at: now,
                        last_seen_at: now,
                    },
                );
                tracing::info!(source = %item.source, source_id = %item.source_id, "new item");
                novel.push(item.clone());
            }
        }
    }
    novel
}

/// Start of a `days` lookback window; `None` when it reaches past the
/// representable range, meaning no lower bound.
pub(crate) fn window_start(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    ChronoDuration::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d))
}

pub(crate) fn select_recent<'a, I>(rows: I, now: DateTime<Utc>, days: u32, limit: usize) -> Vec<StoredItem>
where
    I: IntoIterator<Item = &'a StoredItem>,
{
    let since = window_start(now, days);
    let mut out: Vec<StoredItem> = rows
        .into_iter()
        .filter(|r| since.map_or(true, |s| r.first_seen_at >= s))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.first_seen_at.cmp(&a.first_seen_at));
    out.truncate(limit);
    out
}
