//! Enrichment pipeline.
//!
//! On every content-bearing write the service derives weighted keywords,
//! weighted concepts, a bounded summary, a space-joined search index, and a
//! quantized 128-dim embedding from `(title, description, content)`.
//!
//! The provider is a capability seam: anything implementing
//! [`EnrichmentProvider`] can supply the four derivations. The built-in
//! [`LexicalProvider`] is deterministic and fully local. Provider failures
//! are never fatal to the write; the service falls back to a frequency
//! histogram, a zero embedding, and a 200-char summary.

mod embedding;
mod lexical;

pub use embedding::{
    cosine_similarity, dequantize, quantize, zero_embedding, EMBEDDING_DIMENSIONS,
};
pub use lexical::{LexicalProvider, MAX_CONCEPTS, MAX_KEYWORDS, MAX_SUMMARY_CHARS};

use std::collections::BTreeMap;

/// Fallback summary length when the provider is unavailable
const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Borrowed view of the three enrichment source fields.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentParts<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub content: &'a str,
}

/// The derived metadata tuple persisted alongside an item.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    /// Up to 20 `(word, weight)` pairs, weights in (0, 1]
    pub keywords: Vec<(String, f32)>,
    /// Up to 10 `(name, confidence)` pairs, confidences in (0, 1]
    pub concepts: Vec<(String, f32)>,
    /// Bounded summary text (≤ 500 chars)
    pub summary: String,
    /// Space-joined keyword words for cheap substring matching
    pub search_index: String,
    /// Quantized embedding blob, exactly 128 bytes
    pub embedding: Vec<u8>,
}

/// Provider failure. Recovered locally; never reaches callers of the
/// item service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("enrichment provider unavailable: {0}")]
    Unavailable(String),
    #[error("enrichment failed: {0}")]
    Failed(String),
}

/// Capability set an enrichment provider must offer.
///
/// Implementations may batch the derivations internally; each method must
/// be deterministic for identical inputs.
pub trait EnrichmentProvider: Send + Sync {
    fn extract_keywords(
        &self,
        parts: &EnrichmentParts,
    ) -> std::result::Result<Vec<(String, f32)>, ProviderError>;

    fn extract_concepts(
        &self,
        parts: &EnrichmentParts,
    ) -> std::result::Result<Vec<(String, f32)>, ProviderError>;

    fn summarize(&self, parts: &EnrichmentParts) -> std::result::Result<String, ProviderError>;

    /// Produce a raw vector of exactly [`EMBEDDING_DIMENSIONS`] components
    /// in `[-1, 1]`.
    fn embed(&self, parts: &EnrichmentParts) -> std::result::Result<Vec<f32>, ProviderError>;
}

/// Orchestrates the provider and owns the fallback path.
pub struct EnrichmentService {
    provider: Box<dyn EnrichmentProvider>,
}

impl Default for EnrichmentService {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrichmentService {
    /// Service backed by the deterministic lexical provider.
    pub fn new() -> Self {
        Self {
            provider: Box::new(LexicalProvider::new()),
        }
    }

    /// Service backed by a custom provider.
    pub fn with_provider(provider: Box<dyn EnrichmentProvider>) -> Self {
        Self { provider }
    }

    /// Derive the full enrichment tuple. Pure with respect to its inputs;
    /// provider failures degrade to the deterministic fallback.
    pub fn generate(&self, parts: &EnrichmentParts) -> Enrichment {
        match self.try_generate(parts) {
            Ok(enrichment) => enrichment,
            Err(err) => {
                tracing::warn!("enrichment provider failed, using fallback: {err}");
                fallback_enrichment(parts)
            }
        }
    }

    fn try_generate(
        &self,
        parts: &EnrichmentParts,
    ) -> std::result::Result<Enrichment, ProviderError> {
        let keywords = sanitize_weights(self.provider.extract_keywords(parts)?, MAX_KEYWORDS);
        let concepts = sanitize_weights(self.provider.extract_concepts(parts)?, MAX_CONCEPTS);

        let mut summary = self.provider.summarize(parts)?;
        if summary.chars().count() > MAX_SUMMARY_CHARS {
            summary = summary.chars().take(MAX_SUMMARY_CHARS).collect();
        }

        let vector = self.provider.embed(parts)?;
        if vector.len() != EMBEDDING_DIMENSIONS {
            return Err(ProviderError::Failed(format!(
                "provider returned {}-dim embedding, expected {EMBEDDING_DIMENSIONS}",
                vector.len()
            )));
        }

        let search_index = keywords
            .iter()
            .map(|(word, _)| word.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Enrichment {
            keywords,
            concepts,
            summary,
            search_index,
            embedding: quantize(&vector),
        })
    }
}

/// Drop non-finite or non-positive weights, clamp to 1.0, enforce the cap.
fn sanitize_weights(pairs: Vec<(String, f32)>, cap: usize) -> Vec<(String, f32)> {
    let mut out: Vec<(String, f32)> = pairs
        .into_iter()
        .filter(|(word, weight)| !word.is_empty() && weight.is_finite() && *weight > 0.0)
        .map(|(word, weight)| (word, weight.min(1.0)))
        .collect();
    out.truncate(cap);
    out
}

/// Deterministic provider-free enrichment: frequency histogram keywords,
/// zero embedding, first 200 characters as summary, no concepts.
pub fn fallback_enrichment(parts: &EnrichmentParts) -> Enrichment {
    let combined = lexical::combine_fields(parts);

    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for token in lexical::tokenize(&combined) {
        *counts.entry(token).or_default() += 1;
    }
    let max = counts.values().max().copied().unwrap_or(0) as f32;
    let mut keywords: Vec<(String, f32)> = counts
        .into_iter()
        .map(|(word, count)| (word, count as f32 / max))
        .collect();
    keywords.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    keywords.truncate(MAX_KEYWORDS);

    let search_index = keywords
        .iter()
        .map(|(word, _)| word.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Enrichment {
        keywords,
        concepts: Vec::new(),
        summary: combined.chars().take(FALLBACK_SUMMARY_CHARS).collect(),
        search_index,
        embedding: zero_embedding(),
    }
}
