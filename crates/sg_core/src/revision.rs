//! Article revision history and the pure transitions that mutate a body.
//!
//! Every transition consumes an [`Article`] and returns the next state.
//! Significant mutations snapshot the pre-mutation body first, and the
//! validation report is recomputed whenever the body changes.

use std::collections::HashMap;
use std::ops::Range;

use chrono::Utc;

use crate::markdown;
use crate::types::{Article, ArticleVersion, ChatRole, ChatTurn};
use crate::{Error, Result};

pub const NOTE_BEFORE_RESTORE: &str = "Auto-save before restore";
pub const NOTE_BEFORE_REWRITE: &str = "Before manual rewrite";

/// Head of `text` for a history note. Unlike [`markdown::excerpt`], the
/// ellipsis is always appended, whether or not anything was cut.
pub fn note_excerpt(text: &str, max_chars: usize) -> String {
    format!("{}...", text.chars().take(max_chars).collect::<String>())
}

/// Pushes the current body to the front of the revision history.
/// The body itself is left untouched.
pub fn snapshot(mut article: Article, note: impl Into<String>) -> Article {
    let mut timestamp = Utc::now();
    // keep the history strictly ordered even within one clock tick
    if let Some(latest) = article.revision_history.first() {
        if timestamp <= latest.timestamp {
            timestamp = latest.timestamp + chrono::Duration::microseconds(1);
        }
    }
    let version = ArticleVersion {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        body_markdown: article.body_markdown.clone(),
        note: note.into(),
    };
    article.revision_history.insert(0, version);
    article
}

/// Restores `version`, auto-saving the current body first.
pub fn restore(article: Article, version: &ArticleVersion) -> Article {
    let mut article = snapshot(article, NOTE_BEFORE_RESTORE);
    article.body_markdown = version.body_markdown.clone();
    article.revalidated()
}

/// Restores a version of this article by id.
pub fn restore_by_id(article: Article, version_id: &str) -> Result<Article> {
    let version = article
        .revision_history
        .iter()
        .find(|v| v.id == version_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("version {} of article {}", version_id, article.id)))?;
    Ok(restore(article, &version))
}

/// Replaces the byte range `range` of the body with `replacement`.
pub fn apply_rewrite(article: Article, range: Range<usize>, replacement: &str) -> Result<Article> {
    let body = &article.body_markdown;
    if range.start > range.end || range.end > body.len() {
        return Err(Error::InvalidEdit(format!(
            "selection {}..{} is outside the body ({} bytes)",
            range.start,
            range.end,
            body.len()
        )));
    }
    if !body.is_char_boundary(range.start) || !body.is_char_boundary(range.end) {
        return Err(Error::InvalidEdit(format!(
            "selection {}..{} splits a character",
            range.start, range.end
        )));
    }
    let mut updated = String::with_capacity(body.len() + replacement.len());
    updated.push_str(&body[..range.start]);
    updated.push_str(replacement);
    updated.push_str(&body[range.end..]);

    let mut article = snapshot(article, NOTE_BEFORE_REWRITE);
    article.body_markdown = updated;
    Ok(article.revalidated())
}

/// Swaps the URL of a single image occurrence.
pub fn apply_image_result(article: Article, index: usize, url: impl Into<String>) -> Article {
    let mut replacements = HashMap::new();
    replacements.insert(index, url.into());
    apply_image_results(article, &replacements)
}

/// Swaps image URLs for several occurrences in one pass.
/// Does not snapshot; callers snapshot once before the batch starts.
pub fn apply_image_results(mut article: Article, replacements: &HashMap<usize, String>) -> Article {
    if replacements.is_empty() {
        return article;
    }
    article.body_markdown = markdown::replace_image_urls(&article.body_markdown, replacements);
    article.revalidated()
}

/// Replaces the whole body, e.g. after an AI refinement.
pub fn apply_refinement(mut article: Article, body: String) -> Article {
    article.body_markdown = body;
    article.revalidated()
}

/// Plain incremental typing: no snapshot.
pub fn apply_manual_edit(mut article: Article, body: String) -> Article {
    article.body_markdown = body;
    article.revalidated()
}

pub fn record_turn(mut article: Article, role: ChatRole, text: impl Into<String>) -> Article {
    article.conversation_log.push(ChatTurn::new(role, text));
    article
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArticleMetadata, ContentRequest, Provider};

    fn article(body: &str) -> Article {
        let request = ContentRequest::new("zeta guide", "zeta");
        Article::new(
            &request,
            ArticleMetadata::fallback("zeta guide"),
            body.to_string(),
            Provider::Gemini,
        )
    }

    #[test]
    fn test_snapshot_keeps_body() {
        let a = snapshot(article("v1"), "first");
        assert_eq!(a.body_markdown, "v1");
        assert_eq!(a.revision_history.len(), 1);
        assert_eq!(a.revision_history[0].body_markdown, "v1");
        assert_eq!(a.revision_history[0].note, "first");
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let a = snapshot(article("v1"), "one");
        let a = apply_manual_edit(a, "v2".to_string());
        let a = snapshot(a, "two");
        assert_eq!(a.revision_history[0].note, "two");
        assert_eq!(a.revision_history[1].note, "one");
        assert!(a.revision_history[0].timestamp > a.revision_history[1].timestamp);
    }

    #[test]
    fn test_restore_snapshots_current_body() {
        let a = snapshot(article("original"), "initial");
        let version = a.revision_history[0].clone();
        let a = apply_manual_edit(a, "edited".to_string());

        let restored = restore(a, &version);
        assert_eq!(restored.body_markdown, "original");
        assert_eq!(restored.revision_history.len(), 2);
        assert_eq!(restored.revision_history[0].body_markdown, "edited");
        assert_eq!(restored.revision_history[0].note, NOTE_BEFORE_RESTORE);
    }

    #[test]
    fn test_restore_by_unknown_id() {
        let a = article("x");
        assert!(matches!(restore_by_id(a, "nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_apply_rewrite_splices_and_snapshots() {
        let a = article("# zeta guide\n\nThis sentence is slow and long.");
        let start = a.body_markdown.find("This").unwrap();
        let end = a.body_markdown.len();
        let a = apply_rewrite(a, start..end, "Short one.").unwrap();
        assert_eq!(a.body_markdown, "# zeta guide\n\nShort one.");
        assert_eq!(a.revision_history[0].note, NOTE_BEFORE_REWRITE);
        assert_eq!(a.revision_history[0].body_markdown, "# zeta guide\n\nThis sentence is slow and long.");
        assert!(a.validation.unwrap().keyword_in_h1);
    }

    #[test]
    fn test_apply_rewrite_rejects_bad_ranges() {
        assert!(apply_rewrite(article("abc"), 2..10, "x").is_err());
        assert!(apply_rewrite(article("héllo"), 2..3, "x").is_err());
    }

    #[test]
    fn test_apply_image_result_revalidates() {
        let a = article("# zeta guide\n\n![cover](https://placehold.co/1x1)");
        let a = apply_image_result(a, 0, "data:image/jpeg;base64,AAAA");
        assert_eq!(a.body_markdown, "# zeta guide\n\n![cover](data:image/jpeg;base64,AAAA)");
        assert!(a.validation.is_some());
        assert!(a.revision_history.is_empty());
    }

    #[test]
    fn test_note_excerpt_always_ends_with_ellipsis() {
        assert_eq!(note_excerpt("make it more casual please", 15), "make it more ca...");
        assert_eq!(note_excerpt("hi", 15), "hi...");
        assert_eq!(note_excerpt("héllo wörld", 4), "héll...");
        assert_eq!(markdown::excerpt("hi", 15), "hi");
    }

    #[test]
    fn test_record_turn() {
        let a = record_turn(article("x"), ChatRole::User, "hi");
        assert_eq!(a.conversation_log.len(), 1);
        assert_eq!(a.conversation_log[0].role, ChatRole::User);
    }
}
