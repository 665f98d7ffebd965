pub mod aggregate;
pub mod analysis;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod evaluate;
pub mod experiment;
pub mod extract;
pub mod formats;
pub mod ingest;
pub mod models;
pub mod output;
pub mod rerank;
pub mod search;
pub mod stores;
pub mod traits;

pub use aggregate::{compose_instruction, with_transient_retry, PipelineContext};
pub use analysis::{analyze_layout, AnalysisCredentials};
pub use chunking::{normalize_whitespace, split_fixed_windows, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, EmbeddingModel, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, QueryError};
pub use evaluate::{cosine_similarity, SimilarityEvaluator};
pub use experiment::{
    load_query_definitions, ExperimentConfig, ExperimentRunner, PromptShapePolicy, QueryDefinition,
};
pub use formats::{DocumentFormat, REGISTERED_FORMATS};
pub use ingest::{discover_files, load_documents, load_format_files, AllowedFormats};
pub use models::{
    Chunk, ChunkingStrategy, EvaluationRecord, IndexDefinition, IndexQuery, QueryOutput,
    RetrievedDocument, SearchParameters, SearchResult,
};
pub use output::JsonlOutputStore;
pub use rerank::{rerank_documents, LexicalCrossEncoder, RerankSettings, RerankType};
pub use search::{query_index, SearchVariant, SEARCH_VARIANTS};
pub use stores::{RestDatasetRegistry, RestResponseGenerator, RestSearchIndex};
pub use traits::{
    CrossEncoder, DatasetRegistry, Evaluator, OutputStore, QuestionPolicy, ResponseGenerator,
    SearchIndex,
};
