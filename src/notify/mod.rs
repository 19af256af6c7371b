// src/notify/mod.rs
pub mod slack;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Settings;
use crate::models::TrendItem;

pub use slack::SlackNotifier;

/// Delivery channel for a run's novel items.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn is_configured(&self) -> bool;

    /// `true` only when the message was accepted. Failures are logged, never raised.
    async fn send(&self, items: &[TrendItem]) -> bool;

    fn name(&self) -> &'static str;
}

pub fn notifier_from_settings(settings: &Settings) -> Result<Box<dyn Notifier>> {
    Ok(Box::new(SlackNotifier::new(
        settings.slack_webhook_url.clone(),
        settings.http_timeout,
    )?))
}
