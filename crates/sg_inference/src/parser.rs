use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sg_core::ArticleMetadata;
use tracing::warn;

lazy_static! {
    static ref JSON_BLOCK: Regex = Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub metadata: ArticleMetadata,
    pub body: String,
}

fn string_field(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Splits raw model output into metadata and Markdown body.
///
/// The first ```json fence is merged field by field over the topic
/// defaults and removed from the body. A missing or malformed block keeps
/// the whole text as body with default metadata. Never fails.
pub fn parse_response(raw: &str, fallback_topic: &str) -> ParsedResponse {
    let mut metadata = ArticleMetadata::fallback(fallback_topic);

    let Some(captures) = JSON_BLOCK.captures(raw) else {
        return ParsedResponse {
            metadata,
            body: raw.to_string(),
        };
    };

    let object = match serde_json::from_str::<Value>(&captures[1]) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            warn!("Metadata block is not a JSON object, using defaults");
            return ParsedResponse {
                metadata,
                body: raw.to_string(),
            };
        }
        Err(e) => {
            warn!("Failed to parse metadata JSON from response: {}", e);
            return ParsedResponse {
                metadata,
                body: raw.to_string(),
            };
        }
    };

    if let Some(title) = string_field(&object, "title") {
        metadata.title = title;
    }
    if let Some(slug) = string_field(&object, "slug") {
        metadata.slug = slug;
    }
    if let Some(description) = string_field(&object, "metaDescription") {
        metadata.meta_description = description;
    }
    if let Some(Value::Array(tags)) = object.get("tags") {
        metadata.tags = tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    let block = captures.get(0).map(|m| m.range()).unwrap_or(0..0);
    let mut body = String::with_capacity(raw.len());
    body.push_str(&raw[..block.start]);
    body.push_str(&raw[block.end..]);

    ParsedResponse {
        metadata,
        body: body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "```json\n{\n  \"title\": \"best ai tools\",\n  \"slug\": \"best-ai-tools\",\n  \"metaDescription\": \"Tools that help.\",\n  \"tags\": [\"ai\", \" \", \"tools\"]\n}\n```\n\n# best ai tools\n\nBody text.\n";

    #[test]
    fn test_parses_block_and_strips_it() {
        let parsed = parse_response(RAW, "Best AI Tools");
        assert_eq!(parsed.metadata.title, "best ai tools");
        assert_eq!(parsed.metadata.slug, "best-ai-tools");
        assert_eq!(parsed.metadata.meta_description, "Tools that help.");
        assert_eq!(parsed.metadata.tags, vec!["ai", "tools"]);
        assert_eq!(parsed.body, "# best ai tools\n\nBody text.");
    }

    #[test]
    fn test_missing_block_uses_defaults() {
        let raw = "# just markdown\n\nno metadata";
        let parsed = parse_response(raw, "My Topic");
        assert_eq!(parsed.metadata, ArticleMetadata::fallback("My Topic"));
        assert_eq!(parsed.metadata.slug, "my-topic");
        assert_eq!(parsed.body, raw);
    }

    #[test]
    fn test_malformed_block_keeps_full_text() {
        let raw = "```json\n{ not json }\n```\n# body";
        let parsed = parse_response(raw, "Topic");
        assert_eq!(parsed.metadata.title, "Topic");
        assert_eq!(parsed.body, raw);
    }

    #[test]
    fn test_partial_fields_merge_over_defaults() {
        let raw = "```json\n{\"title\": \"custom\", \"slug\": \"\", \"metaDescription\": 42}\n```\n# custom";
        let parsed = parse_response(raw, "Topic Name");
        assert_eq!(parsed.metadata.title, "custom");
        assert_eq!(parsed.metadata.slug, "topic-name");
        assert_eq!(parsed.metadata.meta_description, "A comprehensive guide about Topic Name.");
        assert_eq!(parsed.body, "# custom");
    }

    #[test]
    fn test_non_object_json_is_a_failure() {
        let raw = "```json\n[1, 2]\n```\n# body";
        assert_eq!(parse_response(raw, "T").body, raw);
    }

    #[test]
    fn test_parse_is_idempotent() {
        for raw in [RAW, "plain", "```json\n{bad\n```"] {
            assert_eq!(parse_response(raw, "Topic"), parse_response(raw, "Topic"));
        }
    }

    #[test]
    fn test_only_first_block_is_metadata() {
        let raw = "```json\n{\"title\": \"a\"}\n```\n# a\n\n```json\n{\"example\": true}\n```";
        let parsed = parse_response(raw, "T");
        assert_eq!(parsed.metadata.title, "a");
        assert!(parsed.body.contains("{\"example\": true}"));
    }
}
