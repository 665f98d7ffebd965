use crate::error::QueryError;
use crate::models::{Chunk, IndexDefinition, IndexQuery, QueryOutput, RetrievedDocument, SearchResult};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The external search service. Index creation and population happen once
/// per grid point; `search` is read-only.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn ensure_index(&self, definition: &IndexDefinition) -> Result<(), QueryError>;

    async fn index_chunks(
        &self,
        index_name: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), QueryError>;

    async fn search(
        &self,
        index_name: &str,
        query: &IndexQuery,
    ) -> Result<Vec<RetrievedDocument>, QueryError>;
}

/// Synthesizes an answer from an instruction block and the user prompt.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate_response(&self, instruction: &str, prompt: &str)
        -> Result<String, QueryError>;
}

/// Scores retrieved documents against expected ground truth, returning
/// the documents kept after threshold filtering plus named metrics.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, result: &SearchResult, expected: &str) -> (Vec<String>, BTreeMap<String, f64>);
}

/// Local relevance-scoring model used by cross-encoder reranking.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, query: &str, document: &str) -> f64;
}

/// Persisted store for query outputs.
pub trait OutputStore: Send + Sync {
    fn load(&self) -> Result<Vec<QueryOutput>, QueryError>;
    fn save(&self, output: &QueryOutput) -> Result<(), QueryError>;
}

/// Registers the artifact produced by one grid point with an external
/// dataset catalog.
#[async_trait]
pub trait DatasetRegistry: Send + Sync {
    async fn register(&self, name: &str) -> Result<(), QueryError>;
}

/// Decides whether a prompt should be decomposed into multiple questions
/// before retrieval.
pub trait QuestionPolicy: Send + Sync {
    fn needs_multi_question(&self, prompt: &str) -> bool;
}
