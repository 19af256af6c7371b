// src/sources/mod.rs
pub mod github;
pub mod hackernews;

use anyhow::Result;

pub use github::GitHubTrendingSource;
pub use hackernews::HackerNewsSource;

/// A trend origin. `fetch` returns records in source presentation order,
/// skipping malformed entries; `Err` means the whole fetch failed.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    type Record: Send;

    async fn fetch(&self) -> Result<Vec<Self::Record>>;
    fn name(&self) -> &'static str;
}

pub(crate) const USER_AGENT: &str = concat!("trend-sieve/", env!("CARGO_PKG_VERSION"));
