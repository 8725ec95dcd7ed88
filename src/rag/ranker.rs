use std::cmp::Ordering;

use serde::{Serialize, Serializer};

use super::record::{EventMetadata, VectorRecord};

/// Cosine similarity over the overlapping prefix of `a` and `b`.
///
/// Returns `NaN` when the overlap is empty or either truncated vector has
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a[..len].iter().zip(&b[..len]) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// NaN compares below every number.
fn descending(left: f32, right: f32) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit<'a> {
    pub record: &'a VectorRecord,
    pub score: f32,
}

/// Top `k` records by descending similarity; ties keep corpus order.
pub fn rank<'a>(query: &[f32], corpus: &'a [VectorRecord], k: usize) -> Vec<RankedHit<'a>> {
    let mut scored: Vec<RankedHit<'a>> = corpus
        .iter()
        .map(|record| RankedHit {
            record,
            score: cosine_similarity(query, &record.embedding),
        })
        .collect();
    scored.sort_by(|left, right| descending(left.score, right.score));
    scored.truncate(k);
    scored
}

/// Wire form of a hit, as returned to HTTP and socket clients.
#[derive(Debug, Clone, Serialize)]
pub struct HitView {
    pub id: String,
    pub metadata: EventMetadata,
    pub text: String,
    #[serde(serialize_with = "serialize_score")]
    pub score: f32,
}

impl From<&RankedHit<'_>> for HitView {
    fn from(hit: &RankedHit<'_>) -> Self {
        Self {
            id: hit.record.id.clone(),
            metadata: hit.record.metadata.clone(),
            text: hit.record.text.clone(),
            score: hit.score,
        }
    }
}

fn serialize_score<S: Serializer>(score: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if score.is_nan() {
        return serializer.serialize_none();
    }
    let rounded = (f64::from(*score) * 10_000.0).round() / 10_000.0;
    serializer.serialize_f64(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    fn record(id: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord::new(id, EventMetadata::default(), id, embedding)
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.3, -1.2, 4.0];
        let b = [2.0, 0.5, -0.7];
        assert!(approx_eq(cosine_similarity(&a, &b), cosine_similarity(&b, &a)));
    }

    #[test]
    fn longer_query_compares_overlapping_prefix() {
        let score = cosine_similarity(&[1.0, 0.0, 9.0], &[1.0, 0.0]);
        assert!(approx_eq(score, 1.0));
    }

    #[test]
    fn zero_norm_yields_nan() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_nan());
        assert!(cosine_similarity(&[], &[1.0]).is_nan());
    }

    #[test]
    fn ranks_reference_scenario() {
        let corpus = vec![
            record("1", vec![1.0, 0.0]),
            record("2", vec![0.0, 1.0]),
            record("3", vec![0.7, 0.7]),
        ];

        let hits = rank(&[1.0, 0.0], &corpus, 2);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "1");
        assert!(approx_eq(hits[0].score, 1.0));
        assert_eq!(hits[1].record.id, "3");
        assert!((hits[1].score - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn k_larger_than_corpus_returns_everything() {
        let corpus = vec![record("a", vec![1.0]), record("b", vec![-1.0])];
        assert_eq!(rank(&[1.0], &corpus, 10).len(), 2);
        assert!(rank(&[1.0], &corpus, 0).is_empty());
    }

    #[test]
    fn ties_keep_corpus_order_and_nan_sorts_last() {
        let corpus = vec![
            record("zero", vec![0.0, 0.0]),
            record("first", vec![2.0, 0.0]),
            record("second", vec![5.0, 0.0]),
            record("other", vec![0.0, 1.0]),
        ];

        let ids: Vec<&str> = rank(&[1.0, 0.0], &corpus, 4)
            .iter()
            .map(|hit| hit.record.id.as_str())
            .collect();

        assert_eq!(ids, vec!["first", "second", "other", "zero"]);
    }

    #[test]
    fn hit_view_rounds_score_and_nulls_nan() {
        let rec = record("x", vec![1.0]);
        let view = HitView::from(&RankedHit {
            record: &rec,
            score: 0.707_106_8,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["score"], serde_json::json!(0.7071));
        assert!(json.get("metadata").is_some());

        let nan = HitView::from(&RankedHit {
            record: &rec,
            score: f32::NAN,
        });
        assert!(serde_json::to_value(&nan).unwrap()["score"].is_null());
    }
}
