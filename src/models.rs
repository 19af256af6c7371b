// src/models.rs
//! Record shapes shared across the pipeline: the two raw source records, the
//! enrichment result, the classifier output and the canonical `TrendItem`
//! that gets persisted and notified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a trend item came from. Together with the origin-local id this is the
/// identity of an item across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "hackernews")]
    HackerNews,
}

impl Origin {
    /// Fixed presentation order.
    pub const ALL: [Origin; 2] = [Origin::GitHub, Origin::HackerNews];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::GitHub => "github",
            Origin::HackerNews => "hackernews",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata values are either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Text(String),
}

impl MetaValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(n) => Some(*n),
            MetaValue::Text(_) => None,
        }
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Int(n)
    }
}

impl From<u64> for MetaValue {
    fn from(n: u64) -> Self {
        MetaValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(n) => write!(f, "{n}"),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered so serialized output is stable.
pub type Metadata = BTreeMap<String, MetaValue>;

/// One entry of the GitHub trending page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/repo`
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    /// Stars gained in the selected period ("N stars today").
    pub stars_today: u64,
    pub forks: u64,
}

/// One Hacker News story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub title: String,
    pub url: String,
    /// Normalized self-text of Ask/Show HN posts.
    pub text: Option<String>,
    pub meta: Metadata,
}

/// README + license information for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub readme: Option<String>,
    /// Lower-cased SPDX id, e.g. `mit`.
    pub license: Option<String>,
    pub is_open_source: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    pub language: String,
    pub code: String,
}

/// A repository that cleared the relevance threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRepository {
    pub repository: Repository,
    /// Always within 1..=10.
    pub relevance_score: u8,
    pub summary: String,
    pub matched_interests: Vec<String>,
    pub license: Option<String>,
    pub is_open_source: bool,
    /// Empty unless the repository is confirmed open source.
    pub code_examples: Vec<CodeExample>,
}

/// Canonical item shape shared by both origins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendItem {
    pub source: Origin,
    pub source_id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "metadata_without_nulls")]
    pub metadata: Metadata,
    #[serde(default)]
    pub relevance_score: Option<u8>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matched_interests: Vec<String>,
    #[serde(default)]
    pub code_example: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_open_source: bool,
}

/// Database rows may hold `null` where the model has a default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Rows written with an unknown value (e.g. a repository without a language)
/// carry `null` entries; those keys are dropped.
fn metadata_without_nulls<'de, D>(d: D) -> Result<Metadata, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<MetaValue>>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect())
}

impl TrendItem {
    /// A bare item with only identity and link fields filled.
    pub fn new(
        source: Origin,
        source_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            title: title.into(),
            url: url.into(),
            description: None,
            metadata: Metadata::new(),
            relevance_score: None,
            summary: None,
            matched_interests: Vec::new(),
            code_example: None,
            license: None,
            is_open_source: false,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            source: self.source,
            source_id: self.source_id.clone(),
        }
    }
}

/// Dedup identity: `(origin, origin-local id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub source: Origin,
    pub source_id: String,
}

/// A persisted item with its observation timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    #[serde(flatten)]
    pub item: TrendItem,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_serializes_to_lowercase_tag() {
        assert_eq!(serde_json::to_string(&Origin::GitHub).unwrap(), "\"github\"");
        assert_eq!(
            serde_json::from_str::<Origin>("\"hackernews\"").unwrap(),
            Origin::HackerNews
        );
    }

    #[test]
    fn metadata_values_are_untagged() {
        let mut meta = Metadata::new();
        meta.insert("points".into(), 42i64.into());
        meta.insert("author".into(), "pg".into());
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"author":"pg","points":42}"#);
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("points").and_then(MetaValue::as_int), Some(42));
    }

    #[test]
    fn null_columns_fall_back_to_defaults() {
        let row = r#"{"id": 7, "source": "hackernews", "source_id": "1", "title": "t", "url": "u",
            "metadata": null, "matched_interests": null, "is_open_source": null,
            "first_seen_at": "2025-01-01T00:00:00.123456+00:00",
            "last_seen_at": "2025-01-02T00:00:00+00:00"}"#;
        let stored: StoredItem = serde_json::from_str(row).unwrap();
        assert!(stored.item.metadata.is_empty());
        assert!(stored.item.matched_interests.is_empty());
        assert!(!stored.item.is_open_source);
        assert!(stored.last_seen_at > stored.first_seen_at);
    }

    #[test]
    fn null_metadata_values_are_dropped() {
        let rows = r#"[{"source": "github", "source_id": "a/b", "title": "a/b",
            "url": "https://github.com/a/b",
            "metadata": {"stars": 10, "language": null},
            "first_seen_at": "2025-01-01T00:00:00+00:00",
            "last_seen_at": "2025-01-01T00:00:00+00:00"}]"#;
        let stored: Vec<StoredItem> = serde_json::from_str(rows).unwrap();
        let meta = &stored[0].item.metadata;
        assert_eq!(meta.get("stars").and_then(MetaValue::as_int), Some(10));
        assert!(!meta.contains_key("language"));
    }

    #[test]
    fn stored_item_flattens_trend_fields() {
        let now = Utc::now();
        let stored = StoredItem {
            item: TrendItem::new(Origin::GitHub, "a/b", "a/b", "https://github.com/a/b"),
            first_seen_at: now,
            last_seen_at: now,
        };
        let v = serde_json::to_value(&stored).unwrap();
        assert_eq!(v["source"], "github");
        assert_eq!(v["source_id"], "a/b");
        assert!(v.get("first_seen_at").is_some());
    }
}
