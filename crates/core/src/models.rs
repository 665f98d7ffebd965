use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How raw document text is turned into chunks. `Basic` splits locally by
/// fixed window size; `DocumentIntelligence` asks an external layout
/// service for structural sections first, then windows each section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkingStrategy {
    Basic,
    DocumentIntelligence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub content: String,
    pub source_path: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub score: f64,
}

/// Ranked retrieval output for one query. Consumed immediately by the
/// reranker and evaluator; never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub documents: Vec<RetrievedDocument>,
}

/// The grid coordinates that produced a query execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    pub embedding_model: String,
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub search_variant: String,
    pub index_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub metrics: BTreeMap<String, f64>,
    pub parameters: SearchParameters,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    pub question_variants: Vec<String>,
    pub answers: Vec<String>,
    pub final_answer: String,
    pub rerank: bool,
    pub rerank_type: Option<String>,
    pub evaluations: Vec<EvaluationRecord>,
    pub search_parameters: SearchParameters,
    pub produced_at: DateTime<Utc>,
}

/// Parameters for creating a vector-capable index on the search service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub vector_dimensions: usize,
    pub ef_construction: u32,
    pub ef_search: u32,
}

/// One retrieval request against the search service. Variants are encoded
/// by which fields are populated: keyword carries text only, vector
/// carries an embedding only, hybrid carries both, semantic additionally
/// asks the service for its own reranking pass.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub text: Option<String>,
    pub vector: Option<Vec<f32>>,
    pub top_k: usize,
    pub semantic_ranking: bool,
}
