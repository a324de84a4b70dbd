//! Structured sommelier replies and the parser that recovers them.
//!
//! The upstream model is asked for `{"text": ..., "recommendedIds": [...]}`
//! but is free to answer with code fences, prose, or half an object.
//! [`parse`] never fails: a strict attempt runs first, and when it cannot
//! produce a result the id rescue and the text rescue run independently so
//! a broken text field never loses recoverable ids.

use crate::catalog::{Product, ProductId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Used when a well-formed reply carries no `text`.
pub const FALLBACK_TEXT: &str =
    "Here are a few fragrances from our collection you might enjoy.";
/// Used when nothing displayable survives the text rescue.
pub const RESCUE_FALLBACK_TEXT: &str =
    "I found a few fragrances you might like. Take a look at the highlighted picks.";
/// Shown when the upstream call itself failed.
pub const TECHNICAL_DIFFICULTY_TEXT: &str =
    "I'm having a little technical difficulty right now. Please try again in a moment.";

static IDS_CLAUSE: Lazy<Regex> =
    Lazy::new(|| compile(r#""?recommendedIds"?\s*:\s*\[([^\]]*)\]"#));
static IDS_CLAUSE_LOOSE: Lazy<Regex> =
    Lazy::new(|| compile(r#",?\s*"?recommendedIds"?\s*:\s*\[[^\]]*\]?"#));
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| compile(r"```[A-Za-z0-9_-]*"));
static TEXT_KEY: Lazy<Regex> = Lazy::new(|| compile(r#"(?m)"text"\s*:\s*|^\s*text\s*:\s*"#));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid built-in pattern {pattern}: {err}"))
}

/// Reply consumed by the chat surface. Always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResponse {
    pub text: String,
    /// Ordered set: first-occurrence order, no duplicates.
    pub recommended_ids: Vec<ProductId>,
}

impl ParsedResponse {
    pub fn new(text: impl Into<String>, ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            text: text.into(),
            recommended_ids: dedup(ids),
        }
    }

    /// Safe default returned when the upstream service is unavailable.
    pub fn technical_difficulty() -> Self {
        Self::new(TECHNICAL_DIFFICULTY_TEXT, Vec::new())
    }

    /// Resolves recommended ids against `catalog`, skipping unknown ids.
    pub fn recommended_products<'a>(&self, catalog: &'a [Product]) -> Vec<&'a Product> {
        self.recommended_ids
            .iter()
            .filter_map(|id| catalog.iter().find(|product| &product.id == id))
            .collect()
    }
}

/// Turns a raw upstream reply into a [`ParsedResponse`].
pub fn parse(raw: &str) -> ParsedResponse {
    if let Some(parsed) = parse_strict(raw) {
        return parsed;
    }
    debug!(raw_len = raw.len(), "Strict parse failed, rescuing reply");
    ParsedResponse::new(rescue_text(raw), rescue_ids(raw))
}

/// Parses the span between the first `{` and the last `}` as JSON.
pub fn parse_strict(raw: &str) -> Option<ParsedResponse> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;

    let text = object
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(FALLBACK_TEXT);

    let ids = object
        .get("recommendedIds")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(id_from_value).collect::<Vec<_>>())
        .unwrap_or_default();

    Some(ParsedResponse::new(text, ids))
}

/// Recovers numeric ids from a `"recommendedIds": [...]`-shaped substring.
pub fn rescue_ids(raw: &str) -> Vec<ProductId> {
    let Some(captures) = IDS_CLAUSE.captures(raw) else {
        return Vec::new();
    };
    let list = captures.get(1).map_or("", |m| m.as_str());
    dedup(
        list.split(',')
            .map(|token| token.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter_map(ProductId::parse_numeric),
    )
}

/// Strips JSON scaffolding from a reply to leave a displayable sentence.
pub fn rescue_text(raw: &str) -> String {
    let without_fences = CODE_FENCE.replace_all(raw, "");
    let without_ids = IDS_CLAUSE_LOOSE.replace_all(&without_fences, "");
    let without_braces = without_ids.replace(['{', '}'], "");
    let without_key = TEXT_KEY.replace_all(&without_braces, "");

    let mut text = without_key.trim().trim_end_matches(',').trim_end();
    text = text.strip_prefix('"').unwrap_or(text);
    text = text.strip_suffix('"').unwrap_or(text);

    let text = text.replace("\\n", "\n").replace("\\\"", "\"");
    let text = text.trim();
    if text.is_empty() {
        RESCUE_FALLBACK_TEXT.to_string()
    } else {
        text.to_string()
    }
}

fn id_from_value(value: &Value) -> Option<ProductId> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(ProductId::Int)
            .or_else(|| ProductId::parse_numeric(&n.to_string())),
        Value::String(s) => ProductId::parse(s),
        _ => None,
    }
}

fn dedup(ids: impl IntoIterator<Item = ProductId>) -> Vec<ProductId> {
    let mut out: Vec<ProductId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(ids: &[i64]) -> Vec<ProductId> {
        ids.iter().copied().map(ProductId::Int).collect()
    }

    #[test]
    fn test_strict_json() {
        let parsed = parse(r#"{"text": "Try the Rose Oud.", "recommendedIds": [15, 2]}"#);
        assert_eq!(parsed.text, "Try the Rose Oud.");
        assert_eq!(parsed.recommended_ids, ints(&[15, 2]));
    }

    #[test]
    fn test_strict_json_inside_prose_and_fences() {
        let raw = "Sure!\n```json\n{\"text\": \"Go citrus\", \"recommendedIds\": [\"4\", 9, 4]}\n```";
        let parsed = parse(raw);
        assert_eq!(parsed.text, "Go citrus");
        assert_eq!(parsed.recommended_ids, ints(&[4, 9]));
    }

    #[test]
    fn test_strict_json_missing_fields_use_defaults() {
        let parsed = parse(r#"{"answer": "?"}"#);
        assert_eq!(parsed.text, FALLBACK_TEXT);
        assert!(parsed.recommended_ids.is_empty());
    }

    #[test]
    fn test_string_ids_kept_in_strict_path() {
        let parsed = parse(r#"{"text": "ok", "recommendedIds": ["sku-1", 3, null, true]}"#);
        assert_eq!(
            parsed.recommended_ids,
            vec![ProductId::Str("sku-1".to_string()), ProductId::Int(3)]
        );
    }

    #[test]
    fn test_rescue_from_fenced_invalid_json() {
        let raw = "```json\n{ \"text\": \"Try X\", \"recommendedIds\": [3, \"7\", abc] }\n```";
        let parsed = parse(raw);
        assert_eq!(parsed.text, "Try X");
        assert_eq!(parsed.recommended_ids, ints(&[3, 7]));
    }

    #[test]
    fn test_plain_prose_degrades_gracefully() {
        let parsed = parse("I think you'd like the Rose Oud fragrance.");
        assert_eq!(parsed.text, "I think you'd like the Rose Oud fragrance.");
        assert!(parsed.recommended_ids.is_empty());
    }

    #[test]
    fn test_truncated_reply_keeps_text() {
        let parsed = parse(r#"{"text": "Vetiver suits you, especially the"#);
        assert_eq!(parsed.text, "Vetiver suits you, especially the");
        assert!(parsed.recommended_ids.is_empty());
    }

    #[test]
    fn test_broken_text_does_not_lose_ids() {
        let raw = r#"{"text": "Try "Neroli" today", "recommendedIds": [11, 12]}"#;
        let parsed = parse(raw);
        assert_eq!(parsed.recommended_ids, ints(&[11, 12]));
        assert!(parsed.text.contains("Neroli"));
    }

    #[test]
    fn test_empty_reply_uses_canned_text() {
        assert_eq!(parse("").text, RESCUE_FALLBACK_TEXT);
        assert_eq!(parse("```json\n{\n").text, RESCUE_FALLBACK_TEXT);
    }

    #[test]
    fn test_rescue_unescapes_text() {
        assert_eq!(
            rescue_text(r#""text": "Line one\nLine \"two\"""#),
            "Line one\nLine \"two\""
        );
    }

    #[test]
    fn test_recommended_products_resolves_ids() {
        let product = |id: i64, name: &str| Product {
            id: ProductId::Int(id),
            name: name.to_string(),
            brand: "Test".to_string(),
            olfactory_family: "Floral".to_string(),
            variants: vec![],
            description: String::new(),
        };
        let catalog = vec![product(2, "Iris"), product(15, "Rose Oud")];
        let parsed = ParsedResponse::new("ok", ints(&[15, 99, 2]));

        let names: Vec<&str> = parsed
            .recommended_products(&catalog)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Rose Oud", "Iris"]);
    }
}
