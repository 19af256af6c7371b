use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{apply_upsert, select_recent, TrendStore};
use crate::models::{ItemKey, StoredItem, TrendItem};

/// Process-local store; state lives as long as the value.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<ItemKey, StoredItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ItemKey) -> Option<StoredItem> {
        self.rows.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn upsert_items(&self, items: &[TrendItem]) -> Result<Vec<TrendItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut rows = self.rows.lock().map_err(|_| anyhow!("memory store mutex poisoned"))?;
        Ok(apply_upsert(&mut rows, items, Utc::now()))
    }

    async fn recent_items(&self, days: u32, limit: usize) -> Result<Vec<StoredItem>> {
        let rows = self.rows.lock().map_err(|_| anyhow!("memory store mutex poisoned"))?;
        Ok(select_recent(rows.values(), Utc::now(), days, limit))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
