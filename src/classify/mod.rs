// src/classify/mod.rs
//! Relevance classifier: one batched structured-output call per source batch,
//! then local validation of every returned item.
//!
//! The model's answer is only trusted for score, interests and summary. The
//! index is bounds-checked against the input, the threshold is re-applied and
//! quick-start code is kept only for repositories whose license we confirmed
//! as open source ourselves.

pub mod gemini;
pub mod schema;
pub mod service;

use anyhow::Result;
use metrics::counter;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::Settings;
use crate::enrich::is_open_source;
use crate::metrics::{CLASSIFIER_DROPPED, ITEMS_RELEVANT};
use crate::models::{ClassifiedRepository, CodeExample, Enrichment, Repository};
use crate::text::truncate_with_marker;

pub use gemini::GeminiService;
pub use service::{DisabledService, DynReasoningService, MockService, ReasoningService};

/// README characters sent per repository.
pub const README_EXCERPT_CHARS: usize = 3000;
pub const TRUNCATION_MARKER: &str = "\n[... truncated ...]";

/// One element of the model's response array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierItem {
    /// Repository number from the list (starts at 1).
    pub index: i64,
    /// Relevance to the interests, 1 (unrelated) to 10 (core topic).
    #[schemars(range(min = 1, max = 10))]
    pub relevance_score: i64,
    /// Interests from the given list that the repository matches.
    pub matched_interests: Vec<String>,
    /// Two to three sentence summary.
    pub summary: String,
    /// Quick-start example extracted from the README; null if none fits.
    #[serde(default)]
    pub quick_start: Option<QuickStart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuickStart {
    /// Programming language of the snippet.
    #[serde(default)]
    pub language: String,
    /// Usage code, at most 15 lines, no install commands.
    #[serde(default)]
    pub code: String,
}

/// Response schema sent with every request.
pub fn response_schema() -> Value {
    schema::inlined_schema::<Vec<ClassifierItem>>()
}

pub struct RelevanceClassifier {
    service: DynReasoningService,
    interests: Vec<String>,
    threshold: u8,
    summary_language: String,
}

impl RelevanceClassifier {
    pub fn new(
        service: DynReasoningService,
        interests: Vec<String>,
        threshold: u8,
        summary_language: impl Into<String>,
    ) -> Self {
        Self {
            service,
            interests,
            threshold: threshold.clamp(1, 10),
            summary_language: summary_language.into(),
        }
    }

    /// Gemini when a key is configured, otherwise a disabled service.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let service: DynReasoningService = match GeminiService::from_settings(&settings.gemini)? {
            Some(g) => Arc::new(g),
            None => Arc::new(DisabledService),
        };
        Ok(Self::new(
            service,
            settings.interests.clone(),
            settings.relevance_threshold,
            settings.summary_language.clone(),
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.service.is_configured()
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Score `repos` and keep the relevant ones, in input order. Any failure of
    /// the service call yields an empty list.
    pub async fn classify(
        &self,
        repos: &[Repository],
        enrichment: &HashMap<String, Enrichment>,
    ) -> Vec<ClassifiedRepository> {
        if repos.is_empty() {
            return Vec::new();
        }
        if !self.service.is_configured() {
            tracing::warn!(service = self.service.name(), "classifier not configured, skipping");
            return Vec::new();
        }

        let prompt = self.build_prompt(repos, enrichment);
        let raw = match self.service.generate(&prompt, &response_schema()).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(service = self.service.name(), error = ?e, "classification call failed");
                return Vec::new();
            }
        };

        let Some(items) = parse_items(raw, &self.interests) else {
            tracing::warn!(service = self.service.name(), "classifier response is not an array");
            return Vec::new();
        };

        let out = build_results(items, repos, enrichment, self.threshold);
        counter!(ITEMS_RELEVANT).increment(out.len() as u64);
        tracing::info!(input = repos.len(), relevant = out.len(), "classification done");
        out
    }

    pub fn build_prompt(&self, repos: &[Repository], enrichment: &HashMap<String, Enrichment>) -> String {
        let mut parts = Vec::with_capacity(repos.len());
        for (i, repo) in repos.iter().enumerate() {
            let mut part = format!(
                "### {}. {}\n- URL: {}\n- Description: {}\n- Language: {}\n- Stars: {} (+{} in period)",
                i + 1,
                repo.name,
                repo.url,
                repo.description.as_deref().unwrap_or("none"),
                repo.language.as_deref().unwrap_or("none"),
                group_thousands(repo.stars),
                group_thousands(repo.stars_today),
            );
            if let Some(readme) = enrichment
                .get(&repo.name)
                .and_then(|e| e.readme.as_deref())
                .filter(|r| !r.trim().is_empty())
            {
                let excerpt = truncate_with_marker(readme, README_EXCERPT_CHARS, TRUNCATION_MARKER);
                part.push_str(&format!("\n- README:\n```\n{excerpt}\n```"));
            }
            parts.push(part);
        }

        format!(
            "You are a technology trend analyst. Analyze the GitHub repositories below and keep only \
the ones related to the interests.

## Interests
{interests}

## Repositories
{repos}

## Task
For each repository:
1. Rate its relevance to the interests from 1 to 10.
2. Select only repositories scoring {threshold} or higher. Never output the others.
3. Write a 2-3 sentence summary in {language} for each selected repository.
4. List in matched_interests only entries from the interest list above.
5. If a README is included, extract a Quick Start code example a developer can run right away:
   - leave out install commands (pip install, npm install, ...)
   - only actual library usage code
   - 10-15 lines at most
   - set quick_start to null when there is no suitable example

Use the repository number as index. Return an empty array if nothing is relevant.",
            interests = self.interests.join(", "),
            repos = parts.join("\n\n"),
            threshold = self.threshold,
            language = self.summary_language,
        )
    }
}

/// Validate each array element on its own. `None` if the value is not an array.
/// Elements that fail to deserialize, score outside 1..=10, carry an empty
/// summary or match no configured interest are dropped and counted.
pub fn parse_items(raw: Value, interests: &[String]) -> Option<Vec<ClassifierItem>> {
    let Value::Array(elems) = raw else {
        return None;
    };

    let known: HashMap<String, &String> = interests.iter().map(|i| (i.to_lowercase(), i)).collect();
    let mut out = Vec::with_capacity(elems.len());

    for elem in elems {
        let mut item: ClassifierItem = match serde_json::from_value(elem) {
            Ok(it) => it,
            Err(e) => {
                drop_item("malformed", &e.to_string());
                continue;
            }
        };
        if !(1..=10).contains(&item.relevance_score) {
            drop_item("score_out_of_range", &item.relevance_score.to_string());
            continue;
        }
        if item.summary.trim().is_empty() {
            drop_item("empty_summary", &item.index.to_string());
            continue;
        }

        // Map labels onto the configured spelling; unknown ones are discarded.
        let mut seen = HashSet::new();
        item.matched_interests = item
            .matched_interests
            .iter()
            .filter_map(|m| known.get(&m.trim().to_lowercase()).map(|s| (*s).clone()))
            .filter(|m| seen.insert(m.clone()))
            .collect();
        if item.matched_interests.is_empty() {
            drop_item("no_known_interest", &item.index.to_string());
            continue;
        }
        out.push(item);
    }
    Some(out)
}

fn drop_item(reason: &'static str, detail: &str) {
    tracing::warn!(reason, detail, "dropping classifier item");
    counter!(CLASSIFIER_DROPPED, "reason" => reason).increment(1);
}

/// Map validated items back onto their input repositories.
///
/// Pure post-processing: out-of-range positions are discarded silently, the
/// first item wins for a repeated position, sub-threshold scores are removed
/// and code examples require a README plus a license on the allow-list.
pub fn build_results(
    items: Vec<ClassifierItem>,
    repos: &[Repository],
    enrichment: &HashMap<String, Enrichment>,
    threshold: u8,
) -> Vec<ClassifiedRepository> {
    let mut by_position: Vec<Option<ClassifiedRepository>> = vec![None; repos.len()];
    let mut claimed = vec![false; repos.len()];

    for item in items {
        let Some(pos) = usize::try_from(item.index)
            .ok()
            .filter(|i| (1..=repos.len()).contains(i))
            .map(|i| i - 1)
        else {
            counter!(CLASSIFIER_DROPPED, "reason" => "index_out_of_range").increment(1);
            continue;
        };
        if std::mem::replace(&mut claimed[pos], true) {
            continue;
        }
        let Ok(score) = u8::try_from(item.relevance_score) else {
            continue;
        };
        if !(1..=10).contains(&score) || score < threshold {
            continue;
        }

        let repo = &repos[pos];
        let meta = enrichment.get(&repo.name);
        let license = meta.and_then(|m| m.license.clone());
        let confirmed_open_source = is_open_source(license.as_deref());
        let has_readme = meta
            .and_then(|m| m.readme.as_deref())
            .is_some_and(|r| !r.trim().is_empty());

        let code_examples = match item.quick_start {
            Some(qs) if confirmed_open_source && has_readme && !qs.code.trim().is_empty() => {
                let language = Some(qs.language.trim())
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .or_else(|| repo.language.clone())
                    .unwrap_or_else(|| "text".to_string());
                vec![CodeExample {
                    language,
                    code: qs.code,
                }]
            }
            _ => Vec::new(),
        };

        by_position[pos] = Some(ClassifiedRepository {
            repository: repo.clone(),
            relevance_score: score,
            summary: item.summary.trim().to_string(),
            matched_interests: item.matched_interests,
            license,
            is_open_source: confirmed_open_source,
            code_examples,
        });
    }

    by_position.into_iter().flatten().collect()
}

/// `1234567` → `"1,234,567"`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo(name: &str) -> Repository {
        Repository {
            name: name.to_string(),
            url: format!("https://github.com/{name}"),
            description: Some("desc".into()),
            language: Some("Python".into()),
            stars: 1234,
            stars_today: 56,
            forks: 7,
        }
    }

    fn item(index: i64, score: i64, code: Option<&str>) -> ClassifierItem {
        ClassifierItem {
            index,
            relevance_score: score,
            matched_interests: vec!["LLM".into()],
            summary: "A summary.".into(),
            quick_start: code.map(|c| QuickStart {
                language: String::new(),
                code: c.to_string(),
            }),
        }
    }

    fn enriched(license: Option<&str>, readme: Option<&str>) -> Enrichment {
        Enrichment {
            readme: readme.map(str::to_string),
            license: license.map(str::to_string),
            is_open_source: is_open_source(license),
        }
    }

    #[test]
    fn positions_outside_input_are_dropped() {
        let repos = vec![repo("a/a"), repo("b/b")];
        let items = vec![item(0, 8, None), item(-3, 8, None), item(3, 8, None), item(2, 8, None)];
        let out = build_results(items, &repos, &HashMap::new(), 6);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repository.name, "b/b");
    }

    #[test]
    fn output_follows_input_order_and_first_wins() {
        let repos = vec![repo("a/a"), repo("b/b")];
        let mut dup = item(2, 9, None);
        dup.summary = "second".into();
        let items = vec![item(2, 7, None), item(1, 8, None), dup];
        let out = build_results(items, &repos, &HashMap::new(), 6);
        let names: Vec<_> = out.iter().map(|r| r.repository.name.as_str()).collect();
        assert_eq!(names, vec!["a/a", "b/b"]);
        assert_eq!(out[1].relevance_score, 7);
    }

    #[test]
    fn threshold_is_reapplied_locally() {
        let repos = vec![repo("a/a"), repo("b/b")];
        let out = build_results(vec![item(1, 5, None), item(2, 6, None)], &repos, &HashMap::new(), 6);
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|r| r.relevance_score >= 6 && r.relevance_score <= 10));
    }

    #[test]
    fn code_requires_confirmed_open_source_and_readme() {
        let repos = vec![repo("mit/yes"), repo("prop/no"), repo("none/no"), repo("mit/noreadme")];
        let mut enrichment = HashMap::new();
        enrichment.insert("mit/yes".to_string(), enriched(Some("MIT"), Some("# readme")));
        enrichment.insert("prop/no".to_string(), enriched(Some("proprietary"), Some("# readme")));
        enrichment.insert("none/no".to_string(), enriched(None, Some("# readme")));
        enrichment.insert("mit/noreadme".to_string(), enriched(Some("mit"), None));

        let items = (1..=4).map(|i| item(i, 9, Some("print('hi')"))).collect();
        let out = build_results(items, &repos, &enrichment, 6);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].code_examples.len(), 1);
        assert_eq!(out[0].code_examples[0].language, "Python");
        assert!(out[0].is_open_source);
        for r in &out[1..] {
            assert!(r.code_examples.is_empty(), "{} must not carry code", r.repository.name);
        }
        assert!(!out[1].is_open_source);
        assert!(!out[2].is_open_source);
    }

    #[test]
    fn stale_open_source_flag_is_not_trusted() {
        let repos = vec![repo("x/y")];
        let mut enrichment = HashMap::new();
        enrichment.insert(
            "x/y".to_string(),
            Enrichment {
                readme: Some("# readme".into()),
                license: Some("proprietary".into()),
                is_open_source: true,
            },
        );
        let out = build_results(vec![item(1, 9, Some("run()"))], &repos, &enrichment, 6);
        assert!(out[0].code_examples.is_empty());
        assert!(!out[0].is_open_source);
    }

    #[test]
    fn parse_items_validates_each_element() {
        let interests = vec!["LLM".to_string(), "RAG".to_string()];
        let raw = json!([
            {"index": 1, "relevance_score": 8, "matched_interests": ["llm", "Kubernetes"], "summary": "ok"},
            {"index": 2, "relevance_score": 11, "matched_interests": ["LLM"], "summary": "too high"},
            {"index": 3, "relevance_score": 0, "matched_interests": ["LLM"], "summary": "too low"},
            {"index": 4, "matched_interests": ["LLM"], "summary": "no score"},
            {"index": 5, "relevance_score": 7, "matched_interests": ["Kubernetes"], "summary": "unknown"},
            {"index": 6, "relevance_score": 7, "matched_interests": ["RAG"], "summary": "  "},
            "garbage"
        ]);
        let items = parse_items(raw, &interests).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].index, 1);
        assert_eq!(items[0].matched_interests, vec!["LLM".to_string()]);
    }

    #[test]
    fn non_array_response_is_rejected() {
        assert!(parse_items(json!({"items": []}), &[]).is_none());
    }

    #[test]
    fn prompt_numbers_records_and_truncates_readme() {
        let classifier = RelevanceClassifier::new(
            Arc::new(MockService::returning(json!([]))),
            vec!["LLM".into(), "RAG".into()],
            7,
            "English",
        );
        let repos = vec![repo("a/a"), repo("b/b")];
        let mut enrichment = HashMap::new();
        enrichment.insert("b/b".to_string(), enriched(Some("mit"), Some(&"x".repeat(5000))));

        let prompt = classifier.build_prompt(&repos, &enrichment);
        assert!(prompt.contains("### 1. a/a"));
        assert!(prompt.contains("### 2. b/b"));
        assert!(prompt.contains("LLM, RAG"));
        assert!(prompt.contains("scoring 7 or higher"));
        assert!(prompt.contains("1,234 (+56 in period)"));
        assert!(prompt.contains("[... truncated ...]"));
        assert!(!prompt.contains(&"x".repeat(3001)));
    }

    #[test]
    fn schema_bounds_the_score() {
        let s = response_schema();
        let score = &s["items"]["properties"]["relevance_score"];
        assert_eq!(score["minimum"].as_f64(), Some(1.0));
        assert_eq!(score["maximum"].as_f64(), Some(10.0));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
