// src/config/interests.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_INTERESTS_PATH: &str = "INTERESTS_PATH";
pub const ENV_INTERESTS: &str = "TREND_INTERESTS";

/// Built-in interest list used when nothing else is configured.
pub const DEFAULT_INTERESTS: &[&str] = &[
    "AI Agent",
    "LLM",
    "RAG",
    "Vector DB",
    "Embedding",
    "GPT",
    "Claude",
    "Langchain",
    "LlamaIndex",
    "Ollama",
    "Fine-tuning",
    "Prompt Engineering",
    "AI Assistant",
    "Machine Learning",
    "Deep Learning",
    "Transformer",
];

/// Load interests from an explicit path. Supports TOML or JSON formats.
pub fn load_interests_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading interests from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_interests(&content, ext.as_str())
}

/// Resolve the interest list:
/// 1) `$TREND_INTERESTS` (comma separated)
/// 2) `$INTERESTS_PATH`
/// 3) config/interests.toml
/// 4) config/interests.json
/// 5) built-in defaults
pub fn resolve_interests(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Vec<String>> {
    if let Some(inline) = lookup(ENV_INTERESTS) {
        let list = clean_list(inline.split(',').map(str::to_string));
        if !list.is_empty() {
            return Ok(list);
        }
    }
    if let Some(p) = lookup(ENV_INTERESTS_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("INTERESTS_PATH points to non-existent path"));
        }
        return non_empty(load_interests_from(&pb)?);
    }
    for fallback in ["config/interests.toml", "config/interests.json"] {
        let pb = PathBuf::from(fallback);
        if pb.exists() {
            return non_empty(load_interests_from(&pb)?);
        }
    }
    Ok(default_interests())
}

pub fn default_interests() -> Vec<String> {
    DEFAULT_INTERESTS.iter().map(|s| s.to_string()).collect()
}

fn non_empty(list: Vec<String>) -> Result<Vec<String>> {
    if list.is_empty() {
        Err(anyhow!("interest list is empty"))
    } else {
        Ok(list)
    }
}

fn parse_interests(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("interests");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported interests format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlInterests {
        interests: Vec<String>,
    }
    let v: TomlInterests = toml::from_str(s)?;
    Ok(clean_list(v.interests))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empties, dedup case-insensitively keeping the first spelling.
fn clean_list<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && seen.insert(t.to_lowercase()) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dedup_trim_and_formats_work() {
        let toml = r#"interests = [" LLM ", "", "RAG", "rag"]"#;
        let json = r#"["Ollama", "  LLM  ", ""]"#;
        assert_eq!(
            parse_toml(toml).unwrap(),
            vec!["LLM".to_string(), "RAG".to_string()]
        );
        assert_eq!(
            parse_json(json).unwrap(),
            vec!["Ollama".to_string(), "LLM".to_string()]
        );
    }

    #[test]
    fn inline_list_wins_over_path() {
        let env: HashMap<&str, &str> = [
            (ENV_INTERESTS, "Rust, WASM ,,rust"),
            (ENV_INTERESTS_PATH, "/does/not/exist.toml"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        let v = resolve_interests(&lookup).unwrap();
        assert_eq!(v, vec!["Rust".to_string(), "WASM".to_string()]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let lookup = |k: &str| (k == ENV_INTERESTS_PATH).then(|| "/nope/interests.toml".to_string());
        assert!(resolve_interests(&lookup).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("interests.json");
        fs::write(&p, r#"["Agents", "Compilers"]"#).unwrap();
        let path = p.display().to_string();
        let lookup = move |k: &str| (k == ENV_INTERESTS_PATH).then(|| path.clone());
        assert_eq!(
            resolve_interests(&lookup).unwrap(),
            vec!["Agents".to_string(), "Compilers".to_string()]
        );
    }
}
