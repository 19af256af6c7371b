// src/enrich.rs
//! README and license lookup for trending repositories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::Enrichment;
use crate::sources::USER_AGENT;

pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const README_FILES: &[&str] = &["README.md", "readme.md", "Readme.md", "README.rst"];

/// SPDX ids treated as open source (compared lower-cased).
pub const OPEN_SOURCE_LICENSES: &[&str] = &[
    "mit",
    "apache-2.0",
    "gpl-2.0",
    "gpl-3.0",
    "lgpl-2.1",
    "lgpl-3.0",
    "bsd-2-clause",
    "bsd-3-clause",
    "mpl-2.0",
    "unlicense",
    "isc",
    "agpl-3.0",
    "cc0-1.0",
    "wtfpl",
    "zlib",
];

/// Unknown licenses are never permissive.
pub fn is_open_source(license_id: Option<&str>) -> bool {
    match license_id.map(str::trim) {
        Some(id) if !id.is_empty() => {
            let id = id.to_ascii_lowercase();
            OPEN_SOURCE_LICENSES.contains(&id.as_str())
        }
        _ => false,
    }
}

/// Returns exactly one entry per requested name, failures included.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    async fn fetch_many(&self, names: &[String]) -> HashMap<String, Enrichment>;
}

pub struct ReadmeEnricher {
    client: reqwest::Client,
    raw_base: String,
    api_base: String,
    token: Option<String>,
}

impl ReadmeEnricher {
    pub fn new(timeout: Duration, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building enricher http client")?;
        Ok(Self {
            client,
            raw_base: RAW_CONTENT_BASE.to_string(),
            api_base: GITHUB_API_BASE.to_string(),
            token,
        })
    }

    pub fn with_base_urls(mut self, raw_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.raw_base = raw_base.into().trim_end_matches('/').to_string();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// First README variant that answers 2xx.
    async fn fetch_readme(&self, name: &str) -> Option<String> {
        for file in README_FILES {
            let url = format!("{}/{name}/HEAD/{file}", self.raw_base);
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => return Some(body),
                    Err(e) => tracing::debug!(repo = name, file, error = ?e, "readme body read failed"),
                },
                Ok(_) => {}
                Err(e) => tracing::debug!(repo = name, file, error = ?e, "readme request failed"),
            }
        }
        None
    }

    async fn fetch_license(&self, name: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct LicenseResp {
            license: Option<LicenseInfo>,
        }
        #[derive(Deserialize)]
        struct LicenseInfo {
            spdx_id: Option<String>,
        }

        let url = format!("{}/repos/{name}/license", self.api_base);
        let mut req = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = match req.send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(repo = name, status = %r.status(), "license lookup non-2xx");
                return None;
            }
            Err(e) => {
                tracing::warn!(repo = name, error = ?e, "license lookup failed");
                return None;
            }
        };
        let body: LicenseResp = resp.json().await.ok()?;
        body.license
            .and_then(|l| l.spdx_id)
            .map(|id| id.trim().to_ascii_lowercase())
            .filter(|id| !id.is_empty())
    }

    /// README and license run concurrently; either may be absent.
    pub async fn fetch_metadata(&self, name: &str) -> Enrichment {
        let (readme, license) = tokio::join!(self.fetch_readme(name), self.fetch_license(name));
        let is_open_source = is_open_source(license.as_deref());
        Enrichment {
            readme,
            license,
            is_open_source,
        }
    }
}

#[async_trait]
impl MetadataEnricher for ReadmeEnricher {
    async fn fetch_many(&self, names: &[String]) -> HashMap<String, Enrichment> {
        let results = join_all(names.iter().map(|n| self.fetch_metadata(n))).await;
        let out: HashMap<String, Enrichment> = names.iter().cloned().zip(results).collect();
        tracing::info!(
            requested = names.len(),
            readmes = out.values().filter(|e| e.readme.is_some()).count(),
            open_source = out.values().filter(|e| e.is_open_source).count(),
            "enrichment done"
        );
        out
    }
}
