// src/text.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Max characters kept by [`normalize_text`].
pub const MAX_TEXT_CHARS: usize = 1500;

/// Normalize scraped/API text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // <p> tags in HN self-text separate paragraphs; keep a break before stripping.
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    let re_breaks = RE_BREAKS.get_or_init(|| Regex::new(r"(?i)<p>|<br\s*/?>").unwrap());
    let mut out = re_breaks.replace_all(s, " ").to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // Entities after tags so an escaped `&lt;b&gt;` survives as text.
    out = html_escape::decode_html_entities(&out).to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Cut `s` to at most `max_chars` characters, appending `marker` when cut.
pub fn truncate_with_marker(s: &str, max_chars: usize, marker: &str) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], marker),
    }
}
