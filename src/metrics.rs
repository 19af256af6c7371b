use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

pub const FETCH_ERRORS: &str = "trend_fetch_errors_total";
pub const ITEMS_FETCHED: &str = "trend_items_fetched_total";
pub const ITEMS_RELEVANT: &str = "trend_items_relevant_total";
pub const ITEMS_NOVEL: &str = "trend_items_novel_total";
pub const NOTIFICATIONS_SENT: &str = "trend_notifications_sent_total";
pub const CLASSIFIER_DROPPED: &str = "trend_classifier_dropped_total";
pub const LAST_RUN_TS: &str = "trend_pipeline_last_run_ts";

/// One-time metrics registration (so series carry help text).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(FETCH_ERRORS, "Source fetches that failed entirely.");
        describe_counter!(ITEMS_FETCHED, "Raw records returned by sources.");
        describe_counter!(ITEMS_RELEVANT, "Repositories that cleared the relevance threshold.");
        describe_counter!(ITEMS_NOVEL, "Items never seen before by the store.");
        describe_counter!(NOTIFICATIONS_SENT, "Successful notification deliveries.");
        describe_counter!(
            CLASSIFIER_DROPPED,
            "Classifier response items discarded during validation."
        );
        describe_gauge!(LAST_RUN_TS, "Unix ts when the pipeline last completed.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Write the text exposition to `path` (node-exporter textfile style).
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.handle.render())
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
        Ok(())
    }
}
