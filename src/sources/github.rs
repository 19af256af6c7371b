// src/sources/github.rs
//! GitHub trending page scraper.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::ACCEPT_LANGUAGE;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::config::Since;
use crate::models::Repository;
use crate::sources::{Source, USER_AGENT};

pub const GITHUB_BASE_URL: &str = "https://github.com";

static SEL_ARTICLE: Lazy<Selector> = Lazy::new(|| sel("article.Box-row"));
static SEL_NAME: Lazy<Selector> = Lazy::new(|| sel("h2 a"));
static SEL_DESC: Lazy<Selector> = Lazy::new(|| sel("p"));
static SEL_LANG: Lazy<Selector> = Lazy::new(|| sel("[itemprop='programmingLanguage']"));
static SEL_STARS: Lazy<Selector> = Lazy::new(|| sel("a[href$='/stargazers']"));
static SEL_FORKS: Lazy<Selector> = Lazy::new(|| sel("a[href$='/forks']"));
static SEL_STARS_TODAY: Lazy<Selector> = Lazy::new(|| sel("span.d-inline-block.float-sm-right"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

pub struct GitHubTrendingSource {
    client: reqwest::Client,
    base_url: String,
    since: Since,
    language: Option<String>,
}

impl GitHubTrendingSource {
    pub fn new(since: Since, language: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building github http client")?;
        Ok(Self {
            client,
            base_url: GITHUB_BASE_URL.to_string(),
            since,
            language,
        })
    }

    /// Point at another host (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build_url(&self) -> String {
        let mut url = format!("{}/trending", self.base_url);
        if let Some(lang) = self.language.as_deref().filter(|l| !l.is_empty()) {
            url.push('/');
            url.push_str(lang);
        }
        format!("{url}?since={}", self.since.as_str())
    }
}

#[async_trait]
impl Source for GitHubTrendingSource {
    type Record = Repository;

    async fn fetch(&self) -> Result<Vec<Repository>> {
        let url = self.build_url();
        let body = self
            .client
            .get(&url)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .context("github trending get()")?
            .error_for_status()
            .context("github trending non-2xx")?
            .text()
            .await
            .context("github trending .text()")?;

        let repos = parse_trending_html(&body);
        tracing::debug!(source = "github", url = %url, count = repos.len(), "parsed trending page");
        Ok(repos)
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

/// Parse every `article.Box-row` on a trending page. Entries without a
/// repository link are skipped; duplicates are kept.
pub fn parse_trending_html(html: &str) -> Vec<Repository> {
    let doc = Html::parse_document(html);
    doc.select(&SEL_ARTICLE).filter_map(parse_article).collect()
}

fn parse_article(article: ElementRef<'_>) -> Option<Repository> {
    let href = article.select(&SEL_NAME).next()?.value().attr("href")?.trim();
    let name = href.trim_matches('/');
    if name.is_empty() {
        return None;
    }

    let description = article
        .select(&SEL_DESC)
        .next()
        .map(element_text)
        .filter(|d| !d.is_empty());
    let language = article
        .select(&SEL_LANG)
        .next()
        .map(element_text)
        .filter(|l| !l.is_empty());

    let stars = article
        .select(&SEL_STARS)
        .next()
        .map(|e| parse_number(&element_text(e)))
        .unwrap_or(0);
    let forks = article
        .select(&SEL_FORKS)
        .next()
        .map(|e| parse_number(&element_text(e)))
        .unwrap_or(0);
    let stars_today = article
        .select(&SEL_STARS_TODAY)
        .next()
        .map(|e| parse_stars_today(&element_text(e)))
        .unwrap_or(0);

    Some(Repository {
        name: name.to_string(),
        url: format!("{GITHUB_BASE_URL}/{name}"),
        description,
        language,
        stars,
        stars_today,
        forks,
    })
}

/// Text content with whitespace collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"1,234"` → 1234. Empty or unparsable text yields 0.
pub fn parse_number(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return 0;
    }
    cleaned.parse().unwrap_or_else(|_| {
        tracing::debug!(text, "unparsable count, using 0");
        0
    })
}

/// `"123 stars today"` → 123.
pub fn parse_stars_today(text: &str) -> u64 {
    text.split_whitespace().next().map(parse_number).unwrap_or(0)
}
