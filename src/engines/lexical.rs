//! Shared lexical-embedding primitives used as the fallback similarity
//! substrate across C2 (relevance), C4 (semantic fallback), C5
//! (problem-type exemplar matching), and C7 (clustering) whenever no neural
//! model provider is configured.
//!
//! A hashed bag-of-words vector stands in for a learned sentence embedding:
//! each token is folded into one of `DIMS` buckets, counted, and the vector
//! L2-normalized. It is deliberately crude — good enough to rank similarity,
//! not to approximate a real embedding space.

const DIMS: usize = 256;

/// Splits on non-alphanumeric boundaries and lowercases; drops empty tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Hashes a token deterministically into `[0, DIMS)` using FNV-1a, so the
/// same token always lands in the same bucket across calls and processes.
fn bucket(token: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash as usize) % DIMS
}

/// Builds an L2-normalized hashed bag-of-words embedding for `text`.
pub fn embed(text: &str) -> [f32; DIMS] {
    let mut vector = [0f32; DIMS];
    for token in tokenize(text) {
        vector[bucket(&token)] += 1.0;
    }
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32; DIMS]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity between two embeddings already in `[0,1]` range for
/// non-negative vectors (our embeddings are counts, never negative).
pub fn cosine_similarity(a: &[f32; DIMS], b: &[f32; DIMS]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>().clamp(0.0, 1.0)
}

/// A fixed seed lexicon standing in for a "business/SaaS problem or product
/// discussion" prototype embedding (spec glossary: "business-relevance
/// prototype"), used by C2's relevance dimension.
pub fn business_relevance_prototype() -> [f32; DIMS] {
    embed(
        "startup saas business pricing subscription customers revenue product \
         market launch founder growth churn retention workflow integration api \
         platform automation tool software feature roadmap users feedback",
    )
}

/// Similarity of `text` against a named set of exemplar phrases, taking the
/// maximum similarity across exemplars — used by C5's problem-type
/// classification and C4's business-context tagging.
pub fn max_similarity_against(text: &str, exemplars: &[&str]) -> f32 {
    let embedding = embed(text);
    exemplars
        .iter()
        .map(|exemplar| cosine_similarity(&embedding, &embed(exemplar)))
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        let a = embed("wish there was a cheaper alternative");
        let b = embed("wish there was a cheaper alternative");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unrelated_text_has_low_similarity() {
        let business = business_relevance_prototype();
        let unrelated = embed("the cat sat on the warm windowsill all afternoon");
        assert!(cosine_similarity(&business, &unrelated) < 0.3);
    }

    #[test]
    fn business_text_has_higher_relevance_than_unrelated_text() {
        let business = business_relevance_prototype();
        let saas_post = embed("our startup needs a better subscription pricing page for customers");
        let unrelated = embed("the cat sat on the warm windowsill all afternoon");
        assert!(cosine_similarity(&business, &saas_post) > cosine_similarity(&business, &unrelated));
    }
}
