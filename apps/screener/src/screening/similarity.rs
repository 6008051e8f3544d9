use crate::screening::embedding::{Embedder, EmbeddingError};

/// Cosine similarity of the JD and resume embeddings, scaled to percent.
///
/// Not clamped: an anti-correlated pair yields a negative score.
#[allow(dead_code)]
pub fn semantic_score(
    embedder: &dyn Embedder,
    jd_text: &str,
    resume_text: &str,
) -> Result<f64, EmbeddingError> {
    let jd_embedding = embedder.embed(jd_text)?;
    semantic_score_with(embedder, &jd_embedding, resume_text)
}

/// Same as [`semantic_score`] with the JD already embedded, so a batch pays
/// for the JD forward pass once.
pub fn semantic_score_with(
    embedder: &dyn Embedder,
    jd_embedding: &[f32],
    resume_text: &str,
) -> Result<f64, EmbeddingError> {
    let resume_embedding = embedder.embed(resume_text)?;
    Ok(cosine_similarity(jd_embedding, &resume_embedding) * 100.0)
}

/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
