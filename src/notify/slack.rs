use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Write as _;
use std::time::Duration;

use super::Notifier;
use crate::models::{Origin, TrendItem};

/// Lines per origin group.
pub const MAX_ITEMS_PER_ORIGIN: usize = 5;

pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building slack http client")?;
        Ok(Self {
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            client,
        })
    }

    /// Slack mrkdwn text: a header with the total count, then one group per
    /// origin in fixed order, each capped at [`MAX_ITEMS_PER_ORIGIN`].
    pub fn format_message(items: &[TrendItem]) -> String {
        let mut text = format!(":fire: *Today's AI trends* ({} items)\n", items.len());
        for origin in Origin::ALL {
            let group: Vec<&TrendItem> = items.iter().filter(|i| i.source == origin).collect();
            if group.is_empty() {
                continue;
            }
            let heading = match origin {
                Origin::GitHub => "*:package: GitHub*",
                Origin::HackerNews => "*:newspaper: Hacker News*",
            };
            let _ = write!(text, "\n{heading}\n");
            for item in group.into_iter().take(MAX_ITEMS_PER_ORIGIN) {
                text.push_str(&format_line(item));
                text.push('\n');
            }
        }
        text.trim_end().to_string()
    }

    async fn post(&self, url: &str, text: String) -> Result<()> {
        let body = serde_json::json!({ "text": text });
        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}

fn format_line(item: &TrendItem) -> String {
    let url = escape(&item.url).replace('|', "%7C");
    let title = escape(&item.title).replace('|', "¦");
    let mut line = format!("• <{url}|{title}>");
    if item.source == Origin::HackerNews {
        if let Some(points) = item.metadata.get("points").and_then(|v| v.as_int()) {
            let _ = write!(line, " ({points} points)");
        }
    }
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(line, " - {}", escape(summary));
    }
    if let Some(score) = item.relevance_score {
        let _ = write!(line, " :star: {score}/10");
    }
    line
}

// Slack treats these as control characters in mrkdwn.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, items: &[TrendItem]) -> bool {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("Slack disabled (no SLACK_WEBHOOK_URL)");
            return false;
        };
        if items.is_empty() {
            return false;
        }
        match self.post(url, Self::format_message(items)).await {
            Ok(()) => {
                tracing::info!(count = items.len(), "slack notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(error = ?e, "slack notification failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
