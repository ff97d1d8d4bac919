//! Deterministic SEO scoring of a Markdown body.
//!
//! The checks are regex heuristics over the raw text. Keyword matching is
//! case-insensitive substring matching throughout.
//!
//! | Rule | Points |
//! |------|--------|
//! | H1 present | 10 |
//! | more than 800 words | 10 |
//! | H2 and H3 headings present | 10 |
//! | main keyword in H1 | 15 |
//! | main keyword in the first 800 characters | 10 |
//! | density band `GOOD`, or density above 0.5% | 15 |
//! | every secondary keyword present (at least one requested) | 15 |
//! | otherwise at least 3 secondary keywords present | 10 |
//! | a Markdown link present | 15 |
//!
//! The sum is capped at 100.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::types::{DensityBand, ValidationResult};

/// Characters of the body treated as the introduction.
pub const INTRO_CHARS: usize = 800;
/// Word count above which the length bonus applies.
pub const MIN_WORD_COUNT: usize = 800;
/// Densities (percent) strictly below this are `LOW`.
pub const DENSITY_LOW_BELOW: f64 = 0.5;
/// Densities (percent) strictly above this are `HIGH`.
pub const DENSITY_HIGH_ABOVE: f64 = 2.5;
/// Number of leading sentences sampled for the sentence-length signal.
pub const SENTENCE_SAMPLE: usize = 10;
/// Mean words per sampled sentence must stay below this. Looser than the
/// generation prompt's hard limit on purpose.
pub const SHORT_SENTENCE_MEAN_BELOW: f64 = 25.0;
/// Secondary keyword hits that earn the partial bonus.
pub const PARTIAL_SECONDARY_HITS: usize = 3;

pub const SCORE_H1: u32 = 10;
pub const SCORE_WORD_COUNT: u32 = 10;
pub const SCORE_STRUCTURE: u32 = 10;
pub const SCORE_KEYWORD_IN_H1: u32 = 15;
pub const SCORE_KEYWORD_IN_INTRO: u32 = 10;
pub const SCORE_DENSITY: u32 = 15;
pub const SCORE_ALL_SECONDARY: u32 = 15;
pub const SCORE_PARTIAL_SECONDARY: u32 = 10;
pub const SCORE_LINKS: u32 = 15;
pub const MAX_SCORE: u32 = 100;

lazy_static! {
    static ref H1: Regex = Regex::new(r"(?m)^#\s+(.+)$").unwrap();
    static ref H2: Regex = Regex::new(r"(?m)^##[ \t]").unwrap();
    static ref H3: Regex = Regex::new(r"(?m)^###[ \t]").unwrap();
    static ref LINK: Regex = Regex::new(r"\[.*?\]\(.*?\)").unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?]+").unwrap();
}

/// Scores `body` against the main and secondary keywords.
///
/// Never fails. An empty main keyword matches nothing; blank and duplicate
/// secondary keywords are ignored.
pub fn validate(body: &str, main_keyword: &str, secondary_keywords: &[String]) -> ValidationResult {
    let lower_body = body.to_lowercase();
    let keyword = main_keyword.trim().to_lowercase();

    let h1_text = H1.captures(body).map(|caps| caps[1].to_lowercase());
    let has_h1 = h1_text.is_some();
    let keyword_in_h1 = !keyword.is_empty()
        && h1_text
            .as_deref()
            .map(|text| text.contains(&keyword))
            .unwrap_or(false);

    let has_subheading_structure = H2.is_match(body) && H3.is_match(body);

    let intro: String = lower_body.chars().take(INTRO_CHARS).collect();
    let keyword_in_intro = !keyword.is_empty() && intro.contains(&keyword);

    let keyword_occurrences = if keyword.is_empty() {
        0
    } else {
        lower_body.matches(keyword.as_str()).count()
    };
    let word_count = body.split_whitespace().count();
    let keyword_density = density_percent(keyword_occurrences, word_count);
    let keyword_density_band = density_band(keyword_density);

    let secondary = distinct_keywords(secondary_keywords);
    let secondary_keyword_hits = secondary
        .iter()
        .filter(|kw| lower_body.contains(kw.as_str()))
        .count();

    let has_internal_links = LINK.is_match(body);
    let has_short_sentences = mean_sentence_words(body) < SHORT_SENTENCE_MEAN_BELOW;

    let mut score = 0u32;
    if has_h1 {
        score += SCORE_H1;
    }
    if word_count > MIN_WORD_COUNT {
        score += SCORE_WORD_COUNT;
    }
    if has_subheading_structure {
        score += SCORE_STRUCTURE;
    }
    if keyword_in_h1 {
        score += SCORE_KEYWORD_IN_H1;
    }
    if keyword_in_intro {
        score += SCORE_KEYWORD_IN_INTRO;
    }
    if keyword_density_band == DensityBand::Good || keyword_density > DENSITY_LOW_BELOW {
        score += SCORE_DENSITY;
    }
    if !secondary.is_empty() && secondary_keyword_hits >= secondary.len() {
        score += SCORE_ALL_SECONDARY;
    } else if secondary_keyword_hits >= PARTIAL_SECONDARY_HITS {
        score += SCORE_PARTIAL_SECONDARY;
    }
    if has_internal_links {
        score += SCORE_LINKS;
    }

    ValidationResult {
        has_h1,
        keyword_in_h1,
        has_subheading_structure,
        keyword_in_intro,
        keyword_density_band,
        keyword_density,
        keyword_occurrences,
        word_count,
        secondary_keyword_hits,
        has_short_sentences,
        has_internal_links,
        score: score.min(MAX_SCORE) as u8,
    }
}

/// Occurrences per hundred words. Zero words yields zero.
pub fn density_percent(occurrences: usize, word_count: usize) -> f64 {
    if word_count == 0 {
        return 0.0;
    }
    (occurrences as f64 * 100.0) / word_count as f64
}

pub fn density_band(density: f64) -> DensityBand {
    if density < DENSITY_LOW_BELOW {
        DensityBand::Low
    } else if density > DENSITY_HIGH_ABOVE {
        DensityBand::High
    } else {
        DensityBand::Good
    }
}

fn distinct_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let lower = keyword.trim().to_lowercase();
        if !lower.is_empty() && !out.contains(&lower) {
            out.push(lower);
        }
    }
    out
}

fn mean_sentence_words(body: &str) -> f64 {
    let sentences: Vec<&str> = SENTENCE_END
        .split(body)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(SENTENCE_SAMPLE)
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();
    words as f64 / sentences.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChecklistCategory {
    Structure,
    Seo,
    Quality,
}

/// One line of the publication checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub id: u8,
    pub label: &'static str,
    pub category: ChecklistCategory,
    pub checked: bool,
}

const CHECKLIST: [(u8, &str, ChecklistCategory); 11] = [
    (1, "Unique, optimized H1", ChecklistCategory::Structure),
    (2, "Coherent H2/H3 headings", ChecklistCategory::Structure),
    (3, "Main keyword in H1, intro and H2", ChecklistCategory::Seo),
    (4, "Balanced density (no keyword stuffing)", ChecklistCategory::Seo),
    (5, "3-5 secondary keywords included", ChecklistCategory::Seo),
    (6, "Optimized images (alt text / size)", ChecklistCategory::Quality),
    (7, "Internal links (pillar <-> satellites)", ChecklistCategory::Structure),
    (8, "SEO-friendly meta title and description", ChecklistCategory::Seo),
    (9, "Short sentences (20 words max)", ChecklistCategory::Quality),
    (10, "Short, optimized URL", ChecklistCategory::Seo),
    (11, "SEO score above 85", ChecklistCategory::Seo),
];

/// Publication checklist, auto-checked from a validation report. Items the
/// validator cannot judge (image quality, external score) stay unchecked.
pub fn publication_checklist(result: &ValidationResult) -> Vec<ChecklistItem> {
    CHECKLIST
        .iter()
        .map(|&(id, label, category)| {
            let checked = match id {
                1 => result.has_h1 && result.keyword_in_h1,
                2 => result.has_subheading_structure,
                3 => result.keyword_in_h1 && result.keyword_in_intro,
                4 => result.keyword_density_band == DensityBand::Good,
                5 => result.secondary_keyword_hits >= PARTIAL_SECONDARY_HITS,
                7 => result.has_internal_links,
                // metadata and slug are always generated
                8 | 10 => true,
                9 => result.has_short_sentences,
                _ => false,
            };
            ChecklistItem {
                id,
                label,
                category,
                checked,
            }
        })
        .collect()
}

/// Percentage of checked items, rounded.
pub fn checklist_progress(items: &[ChecklistItem]) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let checked = items.iter().filter(|i| i.checked).count();
    ((checked as f64 / items.len() as f64) * 100.0).round() as u8
}
