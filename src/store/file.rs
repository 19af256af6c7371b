// src/store/file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{apply_upsert, select_recent, TrendStore};
use crate::models::{ItemKey, StoredItem, TrendItem};

/// JSON-file store for local runs. Each upsert rewrites the whole file through
/// a temp file + rename, so a batch lands completely or not at all.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<ItemKey, StoredItem>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let rows: Vec<StoredItem> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing store {}", self.path.display()))?;
        Ok(rows.into_iter().map(|r| (r.item.key(), r)).collect())
    }

    async fn save(&self, rows: &BTreeMap<ItemKey, StoredItem>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let list: Vec<&StoredItem> = rows.values().collect();
        let json = serde_json::to_vec_pretty(&list).context("serializing store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("renaming to {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl TrendStore for FileStore {
    async fn upsert_items(&self, items: &[TrendItem]) -> Result<Vec<TrendItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.lock.lock().await;
        let mut rows = self.load().await?;
        let novel = apply_upsert(&mut rows, items, Utc::now());
        self.save(&rows).await?;
        Ok(novel)
    }

    async fn recent_items(&self, days: u32, limit: usize) -> Result<Vec<StoredItem>> {
        let _guard = self.lock.lock().await;
        let rows = self.load().await?;
        Ok(select_recent(rows.values(), Utc::now(), days, limit))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
