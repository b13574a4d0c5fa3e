//! Quantized semantic embeddings.
//!
//! Vectors are fixed at 128 dimensions and stored as one signed byte per
//! component with a +128 offset: `b[i] = clamp(round(v[i] * 127), -127, 127) + 128`.
//! Similarity is computed on the de-quantized values; the ±1/127 worst-case
//! quantization error is an accepted tradeoff.

/// Embedding dimensions (and stored blob size in bytes)
pub const EMBEDDING_DIMENSIONS: usize = 128;

/// Encoded byte for a zero component
const ZERO_POINT: i32 = 128;

/// Quantize a float vector into the stored byte form.
///
/// The input must be `EMBEDDING_DIMENSIONS` long; components are expected
/// in `[-1, 1]` and are clamped if outside.
pub fn quantize(vector: &[f32]) -> Vec<u8> {
    debug_assert_eq!(vector.len(), EMBEDDING_DIMENSIONS);
    vector
        .iter()
        .map(|&v| {
            let scaled = (v * 127.0).round() as i32;
            (scaled.clamp(-127, 127) + ZERO_POINT) as u8
        })
        .collect()
}

/// Invert [`quantize`].
pub fn dequantize(bytes: &[u8]) -> Vec<f32> {
    bytes
        .iter()
        .map(|&b| (b as i32 - ZERO_POINT) as f32 / 127.0)
        .collect()
}

/// The fallback blob: a zero vector, used when the enrichment provider
/// is unavailable.
pub fn zero_embedding() -> Vec<u8> {
    vec![ZERO_POINT as u8; EMBEDDING_DIMENSIONS]
}

/// Cosine similarity between two vectors. Returns 0.0 for mismatched
/// dimensions or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Deterministic feature-hash embedding over weighted terms.
///
/// Each term hashes to a bucket and a sign; the weighted contributions are
/// accumulated and the result L2-normalized. Identical term histograms
/// always produce identical vectors.
pub fn hashed_embedding(terms: &[(String, f32)]) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIMENSIONS];
    for (term, weight) in terms {
        let hash = fnv1a(term.as_bytes());
        let bucket = (hash % EMBEDDING_DIMENSIONS as u64) as usize;
        let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
