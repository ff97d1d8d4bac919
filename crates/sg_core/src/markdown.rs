//! Heuristic Markdown helpers shared by the validator, the image pipeline
//! and the editing transitions.
//!
//! These are regex scans over raw text, not a Markdown AST.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use url::Url;

/// Host used by generation prompts for placeholder images.
pub const PLACEHOLDER_HOST: &str = "placehold.co";

lazy_static! {
    static ref IMAGE: Regex = Regex::new(r"!\[(.*?)\]\((.*?)\)").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A Markdown image found in a body, addressed by occurrence index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownImage {
    pub index: usize,
    pub alt: String,
    pub url: String,
}

impl MarkdownImage {
    /// True while the image still points at a placeholder.
    pub fn needs_generation(&self) -> bool {
        match Url::parse(&self.url) {
            Ok(url) => url
                .host_str()
                .map(|host| host == PLACEHOLDER_HOST || host.ends_with(".placehold.co"))
                .unwrap_or(false),
            Err(_) => self.url.contains(PLACEHOLDER_HOST),
        }
    }
}

/// Lowercase, whitespace runs collapsed into single dashes.
pub fn slugify(text: &str) -> String {
    WHITESPACE
        .replace_all(&text.trim().to_lowercase(), "-")
        .into_owned()
}

pub fn find_images(body: &str) -> Vec<MarkdownImage> {
    IMAGE
        .captures_iter(body)
        .enumerate()
        .map(|(index, caps)| MarkdownImage {
            index,
            alt: caps[1].to_string(),
            url: caps[2].to_string(),
        })
        .collect()
}

/// Rewrites image URLs in a single pass. Keys are occurrence indexes, so two
/// images sharing the same alt text are still targeted independently.
pub fn replace_image_urls(body: &str, replacements: &HashMap<usize, String>) -> String {
    if replacements.is_empty() {
        return body.to_string();
    }
    let mut occurrence = 0usize;
    IMAGE
        .replace_all(body, |caps: &Captures| {
            let current = occurrence;
            occurrence += 1;
            match replacements.get(&current) {
                Some(url) => format!("![{}]({})", &caps[1], url),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Truncates to `max_chars` characters, appending `...` when something was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Strips Markdown code fences a model may wrap around a JSON payload.
pub fn strip_code_fences(text: &str) -> String {
    let cleaned = text.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "{}".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "# title\n\n![COVER: a](https://placehold.co/1200x600/EEE/31343C?text=COVER)\n\nText.\n\n![same](https://placehold.co/800x400)\n\n![same](https://cdn.example.com/real.jpg)\n\n![same](https://placehold.co/600x600)\n";

    #[test]
    fn test_find_images_indexes_occurrences() {
        let images = find_images(BODY);
        assert_eq!(images.len(), 4);
        assert_eq!(images[0].alt, "COVER: a");
        assert_eq!(images[3].index, 3);
        let pending: Vec<usize> = images
            .iter()
            .filter(|i| i.needs_generation())
            .map(|i| i.index)
            .collect();
        assert_eq!(pending, vec![0, 1, 3]);
    }

    #[test]
    fn test_replace_targets_duplicate_alt_by_index() {
        let mut replacements = HashMap::new();
        replacements.insert(3, "data:image/png;base64,AAA".to_string());
        let updated = replace_image_urls(BODY, &replacements);
        let images = find_images(&updated);
        assert_eq!(images[1].url, "https://placehold.co/800x400");
        assert_eq!(images[2].url, "https://cdn.example.com/real.jpg");
        assert_eq!(images[3].url, "data:image/png;base64,AAA");
        assert_eq!(images[3].alt, "same");
    }

    #[test]
    fn test_replace_without_replacements_is_identity() {
        assert_eq!(replace_image_urls(BODY, &HashMap::new()), BODY);
    }

    #[test]
    fn test_data_url_does_not_need_generation() {
        let image = MarkdownImage {
            index: 0,
            alt: "x".to_string(),
            url: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
        };
        assert!(!image.needs_generation());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("How To Rank\tOn  Google"), "how-to-rank-on-google");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 15), "short");
        assert_eq!(excerpt("make it more casual please", 7), "make it...");
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences(""), "{}");
    }
}
