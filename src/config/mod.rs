// src/config/mod.rs
//! Process-wide settings, built once at startup and handed to each component's
//! constructor. Nothing below `main` reads the environment on its own.

pub mod interests;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_RELEVANCE_THRESHOLD: u8 = 6;
pub const DEFAULT_HN_FETCH_LIMIT: usize = 50;
pub const DEFAULT_HN_NOTIFY_CAP: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Trending period filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Since {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Since {
    pub fn as_str(&self) -> &'static str {
        match self {
            Since::Daily => "daily",
            Since::Weekly => "weekly",
            Since::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Since::Daily),
            "weekly" => Some(Since::Weekly),
            "monthly" => Some(Since::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini: GeminiSettings,
    pub interests: Vec<String>,
    /// 1..=10
    pub relevance_threshold: u8,
    pub summary_language: String,
    pub supabase: Option<SupabaseSettings>,
    pub store_path: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub github_since: Since,
    pub github_language: Option<String>,
    pub github_token: Option<String>,
    pub hn_fetch_limit: usize,
    pub hn_notify_cap: usize,
    pub http_timeout: Duration,
    pub metrics_textfile: Option<String>,
}

impl Settings {
    /// Build from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from a plain map; used by tests.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|k| map.get(k).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let relevance_threshold = match get("RELEVANCE_THRESHOLD") {
            None => DEFAULT_RELEVANCE_THRESHOLD,
            Some(raw) => match raw.parse::<u8>() {
                Ok(v) if (1..=10).contains(&v) => v,
                _ => bail!("RELEVANCE_THRESHOLD must be an integer in 1..=10, got {raw:?}"),
            },
        };

        let interests = interests::resolve_interests(&get)?;

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some(SupabaseSettings { url, key }),
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!("only one of SUPABASE_URL / SUPABASE_KEY is set; Supabase disabled");
                None
            }
            (None, None) => None,
        };

        let github_since = match get("GITHUB_SINCE") {
            None => Since::default(),
            Some(raw) => Since::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown GITHUB_SINCE, using daily");
                Since::Daily
            }),
        };

        Ok(Self {
            gemini: GeminiSettings {
                api_key: get("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
            interests,
            relevance_threshold,
            summary_language: get("SUMMARY_LANGUAGE").unwrap_or_else(|| "English".to_string()),
            supabase,
            store_path: get("TREND_STORE_PATH"),
            slack_webhook_url: get("SLACK_WEBHOOK_URL"),
            github_since,
            github_language: get("GITHUB_LANGUAGE"),
            github_token: get("GITHUB_TOKEN"),
            hn_fetch_limit: parse_or("HN_FETCH_LIMIT", get("HN_FETCH_LIMIT"), DEFAULT_HN_FETCH_LIMIT),
            hn_notify_cap: parse_or("HN_NOTIFY_CAP", get("HN_NOTIFY_CAP"), DEFAULT_HN_NOTIFY_CAP),
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                get("HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            metrics_textfile: get("METRICS_TEXTFILE"),
        })
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "invalid numeric setting, using default");
            default
        }),
    }
}
