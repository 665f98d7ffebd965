use crate::error::QueryError;
use crate::traits::{CrossEncoder, ResponseGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Which reranking algorithm runs. Exactly one applies per configuration;
/// the enabled flag in `RerankSettings` bypasses both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankType {
    Llm,
    CrossEncoder,
}

impl RerankType {
    pub fn name(&self) -> &'static str {
        match self {
            RerankType::Llm => "llm",
            RerankType::CrossEncoder => "cross_encoder",
        }
    }

    pub fn parse(name: &str) -> Result<Self, QueryError> {
        match name {
            "llm" => Ok(RerankType::Llm),
            "cross_encoder" => Ok(RerankType::CrossEncoder),
            other => Err(QueryError::InvalidConfiguration(format!(
                "unknown rerank type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RerankSettings {
    pub enabled: bool,
    pub rerank_type: RerankType,
    pub llm_threshold: f64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rerank_type: RerankType::Llm,
            llm_threshold: 3.0,
        }
    }
}

pub const LLM_RERANK_INSTRUCTION: &str = "\
You rate how relevant each numbered document is to the question, on a scale \
of 1 to 10. Respond with a single JSON object mapping document numbers to \
ratings, for example {\"0\": 7, \"1\": 2}. Respond with the JSON object only.";

/// Reorders or filters retrieved documents by the configured algorithm.
/// Callers check `settings.enabled` before invoking; this function always
/// reranks.
pub async fn rerank_documents(
    documents: &[String],
    query: &str,
    output_prompt: &str,
    settings: &RerankSettings,
    generator: &dyn ResponseGenerator,
    cross_encoder: &dyn CrossEncoder,
) -> Result<Vec<String>, QueryError> {
    match settings.rerank_type {
        RerankType::Llm => llm_rerank(documents, query, output_prompt, settings, generator).await,
        RerankType::CrossEncoder => Ok(cross_encoder_rerank(documents, query, cross_encoder)),
    }
}

/// Asks the response generator to rate every document, keeps those rated
/// at or above the threshold, highest first. Best-effort: an unparseable
/// judgment keeps the retrieved order.
async fn llm_rerank(
    documents: &[String],
    query: &str,
    output_prompt: &str,
    settings: &RerankSettings,
    generator: &dyn ResponseGenerator,
) -> Result<Vec<String>, QueryError> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let listing = documents
        .iter()
        .enumerate()
        .map(|(index, document)| format!("{index}: {document}"))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!("{output_prompt}\nquestion: {query}\ndocuments:\n{listing}");

    let judgment = generator.generate_response(LLM_RERANK_INSTRUCTION, &prompt).await?;

    match parse_ratings(&judgment, documents.len()) {
        Some(mut ratings) => {
            ratings.retain(|(_, rating)| *rating >= settings.llm_threshold);
            ratings.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));
            Ok(ratings
                .into_iter()
                .map(|(index, _)| documents[index].clone())
                .collect())
        }
        None => {
            warn!("rerank judgment was not parseable, keeping retrieved order");
            Ok(documents.to_vec())
        }
    }
}

/// Extracts `{index: rating}` pairs from the model's judgment. Tolerates
/// prose around the JSON object; out-of-range indices are dropped.
fn parse_ratings(raw: &str, document_count: usize) -> Option<Vec<(usize, f64)>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let object: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let fields = object.as_object()?;

    let mut ratings = Vec::new();
    for (key, value) in fields {
        let Ok(index) = key.trim().parse::<usize>() else {
            continue;
        };
        let Some(rating) = value.as_f64() else {
            continue;
        };
        if index < document_count {
            ratings.push((index, rating));
        }
    }

    if ratings.is_empty() {
        None
    } else {
        Some(ratings)
    }
}

/// Deterministic reranking: score every document against the query and
/// sort descending.
fn cross_encoder_rerank(
    documents: &[String],
    query: &str,
    cross_encoder: &dyn CrossEncoder,
) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = documents
        .iter()
        .map(|document| (cross_encoder.score(query, document), document))
        .collect();

    scored.sort_by(|left, right| right.0.total_cmp(&left.0));
    scored.into_iter().map(|(_, document)| document.clone()).collect()
}

/// Token-overlap scorer usable as a local cross-encoder model.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalCrossEncoder;

impl CrossEncoder for LexicalCrossEncoder {
    fn score(&self, query: &str, document: &str) -> f64 {
        let lowered = document.to_lowercase();
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|term| term.len() > 2)
            .map(|term| term.to_string())
            .collect();

        if terms.is_empty() {
            return 0.0;
        }

        let matched = terms.iter().filter(|term| lowered.contains(*term)).count();
        matched as f64 / terms.len() as f64
    }
}
