//! Deterministic lexical enrichment provider.
//!
//! Scores terms with a field blend (title counts most, then description,
//! then content), which keeps the output deterministic for identical inputs
//! and monotone in term frequency. No model download, no network.

use std::collections::BTreeMap;

use super::embedding::hashed_embedding;
use super::{EnrichmentParts, EnrichmentProvider, ProviderError};

/// Maximum keywords returned per item
pub const MAX_KEYWORDS: usize = 20;
/// Maximum concepts returned per item
pub const MAX_CONCEPTS: usize = 10;
/// Summary length ceiling in characters
pub const MAX_SUMMARY_CHARS: usize = 500;

/// Field blend factors: title > description > content.
const FIELD_FACTORS: [f32; 3] = [1.0, 0.6, 0.3];

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "because", "been", "before", "being", "between", "both", "but", "by", "can", "could", "did",
    "do", "does", "doing", "down", "during", "each", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "why", "will", "with", "would",
    "you", "your",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Split text into lowercase index terms: alphanumeric/underscore runs,
/// at least two characters, stop-words and pure numbers dropped.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|tok| tok.chars().count() >= 2)
        .filter(|tok| !is_stop_word(tok))
        .filter(|tok| !tok.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Blended term histogram across the three fields.
///
/// BTreeMap keeps iteration order stable so downstream normalization and
/// tie-breaking are reproducible.
pub(crate) fn term_histogram(parts: &EnrichmentParts) -> BTreeMap<String, f32> {
    let mut scores: BTreeMap<String, f32> = BTreeMap::new();
    for (field, factor) in [parts.title, parts.description, parts.content]
        .iter()
        .zip(FIELD_FACTORS)
    {
        for token in tokenize(field) {
            *scores.entry(token).or_default() += factor;
        }
    }
    scores
}

fn top_weighted(scores: &BTreeMap<String, f32>, cap: usize) -> Vec<(String, f32)> {
    let max = scores.values().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mut ranked: Vec<(String, f32)> = scores
        .iter()
        .map(|(word, score)| (word.clone(), (score / max).min(1.0)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(cap);
    ranked
}

/// The default enrichment provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalProvider;

impl LexicalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EnrichmentProvider for LexicalProvider {
    fn extract_keywords(
        &self,
        parts: &EnrichmentParts,
    ) -> std::result::Result<Vec<(String, f32)>, ProviderError> {
        Ok(top_weighted(&term_histogram(parts), MAX_KEYWORDS))
    }

    fn extract_concepts(
        &self,
        parts: &EnrichmentParts,
    ) -> std::result::Result<Vec<(String, f32)>, ProviderError> {
        // Concept candidates: adjacent term pairs, plus single terms that
        // show up in more than one field.
        let mut scores: BTreeMap<String, f32> = BTreeMap::new();

        let fields = [parts.title, parts.description, parts.content];
        for (field, factor) in fields.iter().zip(FIELD_FACTORS) {
            let tokens = tokenize(field);
            for pair in tokens.windows(2) {
                *scores.entry(format!("{} {}", pair[0], pair[1])).or_default() += factor;
            }
        }

        let mut field_presence: BTreeMap<String, u32> = BTreeMap::new();
        for field in fields {
            let mut seen: Vec<String> = tokenize(field);
            seen.sort();
            seen.dedup();
            for token in seen {
                *field_presence.entry(token).or_default() += 1;
            }
        }
        let histogram = term_histogram(parts);
        for (token, presence) in field_presence {
            if presence >= 2 {
                if let Some(score) = histogram.get(&token) {
                    scores.entry(token).or_insert(*score);
                }
            }
        }

        Ok(top_weighted(&scores, MAX_CONCEPTS))
    }

    fn summarize(&self, parts: &EnrichmentParts) -> std::result::Result<String, ProviderError> {
        let combined = combine_fields(parts);
        Ok(truncate_on_boundary(&combined, MAX_SUMMARY_CHARS))
    }

    fn embed(&self, parts: &EnrichmentParts) -> std::result::Result<Vec<f32>, ProviderError> {
        let terms: Vec<(String, f32)> = term_histogram(parts).into_iter().collect();
        Ok(hashed_embedding(&terms))
    }
}

pub(crate) fn combine_fields(parts: &EnrichmentParts) -> String {
    [parts.title, parts.description, parts.content]
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to `max_chars`, preferring the last sentence boundary past the
/// halfway mark so summaries don't stop mid-word.
fn truncate_on_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let hard: String = text.chars().take(max_chars).collect();
    let floor = max_chars / 2;
    for boundary in [". ", "! ", "? ", "\n"] {
        if let Some(pos) = hard.rfind(boundary) {
            let cut = pos + boundary.trim_end().len();
            if hard[..cut].chars().count() >= floor {
                return hard[..cut].trim_end().to_string();
            }
        }
    }
    hard
}
