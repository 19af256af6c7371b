// src/classify/gemini.rs
//! Gemini `generateContent` client with JSON structured output.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::classify::service::ReasoningService;
use crate::config::GeminiSettings;
use crate::sources::USER_AGENT;

const GEMINI_TIMEOUT: Duration = Duration::from_secs(90);

pub struct GeminiService {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(GEMINI_TIMEOUT)
            .build()
            .context("building gemini http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `None` when the settings carry no API key.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Option<Self>> {
        match &settings.api_key {
            Some(key) => Ok(Some(Self::new(key.clone(), &settings.model, &settings.base_url)?)),
            None => Ok(None),
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl ReasoningService for GeminiService {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.3,
                "maxOutputTokens": 8192,
                "responseMimeType": "application/json",
                "responseJsonSchema": schema,
            }
        });

        let resp: GenerateResponse = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("gemini post")?
            .error_for_status()
            .context("gemini non-2xx")?
            .json()
            .await
            .context("gemini response body")?;

        let text: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            bail!("gemini returned an empty response");
        }
        serde_json::from_str(&text).context("gemini output is not valid JSON")
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
