use crate::embeddings::EmbeddingModel;
use crate::models::SearchResult;
use crate::traits::Evaluator;
use std::collections::BTreeMap;

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right.iter()).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    f64::from(dot / (left_norm * right_norm))
}

/// Scores retrieved documents by embedding-space similarity to the
/// expected content, dropping documents below the threshold.
pub struct SimilarityEvaluator<M> {
    model: M,
    threshold: f64,
}

impl<M: EmbeddingModel> SimilarityEvaluator<M> {
    pub fn new(model: M, threshold: f64) -> Self {
        Self { model, threshold }
    }
}

impl<M: EmbeddingModel> Evaluator for SimilarityEvaluator<M> {
    fn evaluate(&self, result: &SearchResult, expected: &str) -> (Vec<String>, BTreeMap<String, f64>) {
        let expected_vector = self.model.embed(expected);

        let mut kept = Vec::new();
        let mut similarities = Vec::new();

        for document in &result.documents {
            let similarity =
                cosine_similarity(&self.model.embed(&document.content), &expected_vector);
            similarities.push(similarity);
            if similarity >= self.threshold {
                kept.push(document.content.clone());
            }
        }

        let retrieved = result.documents.len();
        let mean = if similarities.is_empty() {
            0.0
        } else {
            similarities.iter().sum::<f64>() / similarities.len() as f64
        };
        let max = similarities.iter().copied().fold(0.0f64, f64::max);

        let mut metrics = BTreeMap::new();
        metrics.insert("mean_similarity".to_string(), mean);
        metrics.insert("max_similarity".to_string(), max);
        metrics.insert("retrieved".to_string(), retrieved as f64);
        metrics.insert("retained".to_string(), kept.len() as f64);

        (kept, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::RetrievedDocument;

    fn result_with(documents: &[&str]) -> SearchResult {
        SearchResult {
            query: "query".to_string(),
            documents: documents
                .iter()
                .map(|content| RetrievedDocument {
                    content: (*content).to_string(),
                    score: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn identical_texts_have_unit_similarity() {
        let embedder = CharacterNgramEmbedder::default();
        let vector = embedder.embed("the same sentence");
        assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn evaluator_filters_below_threshold_and_reports_metrics() {
        let evaluator = SimilarityEvaluator::new(CharacterNgramEmbedder::default(), 0.99);
        let result = result_with(&["expected content verbatim", "entirely unrelated words"]);

        let (kept, metrics) = evaluator.evaluate(&result, "expected content verbatim");

        assert_eq!(kept, vec!["expected content verbatim".to_string()]);
        assert_eq!(metrics["retrieved"], 2.0);
        assert_eq!(metrics["retained"], 1.0);
        assert!(metrics["max_similarity"] > metrics["mean_similarity"]);
    }

    #[test]
    fn empty_result_reports_zero_metrics() {
        let evaluator = SimilarityEvaluator::new(CharacterNgramEmbedder::default(), 0.5);
        let (kept, metrics) = evaluator.evaluate(&result_with(&[]), "expected");

        assert!(kept.is_empty());
        assert_eq!(metrics["retrieved"], 0.0);
        assert_eq!(metrics["mean_similarity"], 0.0);
    }
}
