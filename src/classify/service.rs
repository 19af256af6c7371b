// src/classify/service.rs
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Structured-output language model. `generate` returns the parsed JSON the
/// model produced for `schema`, or an error; never free text.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value>;
    /// False when credentials are missing; callers skip the call entirely.
    fn is_configured(&self) -> bool;
    fn name(&self) -> &'static str;
}

pub type DynReasoningService = Arc<dyn ReasoningService>;

/// Used when no API key is configured.
pub struct DisabledService;

#[async_trait]
impl ReasoningService for DisabledService {
    async fn generate(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        bail!("reasoning service is not configured")
    }
    fn is_configured(&self) -> bool {
        false
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Canned responses for tests and local runs.
pub struct MockService {
    response: std::result::Result<Value, String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockService {
    pub fn returning(response: Value) -> Self {
        Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl ReasoningService for MockService {
    async fn generate(&self, prompt: &str, _schema: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut g) = self.last_prompt.lock() {
            *g = Some(prompt.to_string());
        }
        self.response.clone().map_err(|e| anyhow!(e))
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}
