use std::cmp::Ordering;

use studymate_core::types::{ChunkRecord, SearchHit};

/// Cosine similarity in `[-1, 1]`; `0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    ((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)) as f32
}

/// Exhaustive scan: score every record against `query` and keep the best `k`.
///
/// The sort is stable, so records with equal scores stay in insertion order.
pub fn rank(query: &[f32], records: &[ChunkRecord], k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, f32)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (i, cosine_similarity(query, &r.embedding)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .map(|(i, score)| SearchHit {
            text: records[i].text.clone(),
            source: records[i].source.clone(),
            score,
        })
        .collect()
}
