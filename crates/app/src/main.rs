use chrono::Utc;
use clap::{Parser, Subcommand};
use rag_grid_core::{
    load_documents, AllowedFormats, AnalysisCredentials, CharacterNgramEmbedder, ChunkingStrategy,
    EmbeddingModel, ExperimentConfig, ExperimentRunner, IndexDefinition, JsonlOutputStore,
    LexicalCrossEncoder, PromptShapePolicy, RestDatasetRegistry, RestResponseGenerator,
    RestSearchIndex, SearchIndex, SimilarityEvaluator,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rag-grid", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Search service base URL
    #[arg(long, default_value = "http://localhost:9200/")]
    search_url: String,

    /// Response-generation service base URL
    #[arg(long, default_value = "http://localhost:8080/v1/")]
    generator_url: String,

    /// Deployment/model name on the response-generation service
    #[arg(long, default_value = "default")]
    generator_deployment: String,

    /// API key for the response-generation service
    #[arg(long, env = "GENERATOR_API_KEY")]
    generator_api_key: Option<String>,

    /// Dataset catalog base URL
    #[arg(long, default_value = "http://localhost:8081/")]
    registry_url: String,

    /// Minimum similarity for a retrieved document to be kept
    #[arg(long, default_value = "0.5")]
    eval_threshold: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a document folder and index it for every grid point.
    Index {
        /// Folder containing the corpus, read recursively.
        #[arg(long)]
        folder: String,
        /// Directory holding config.json and the eval data file.
        #[arg(long)]
        config_dir: String,
        /// Formats to ingest; "all" or a comma-separated list.
        #[arg(long, default_value = "all")]
        formats: String,
        /// Chunking strategy: basic or document-intelligence.
        #[arg(long, default_value = "basic")]
        strategy: String,
        /// Layout-analysis service endpoint (document-intelligence only).
        #[arg(long, default_value = "http://localhost:8082/analyze")]
        analysis_url: String,
        /// Layout-analysis API key.
        #[arg(long, env = "ANALYSIS_API_KEY")]
        analysis_api_key: Option<String>,
    },
    /// Sweep the experiment grid and persist query outputs.
    Run {
        /// Directory holding config.json and the eval data file.
        #[arg(long)]
        config_dir: String,
        /// Where query outputs are appended.
        #[arg(long, default_value = "outputs.jsonl")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(started_at = %Utc::now().to_rfc3339(), "rag-grid boot");

    let embedder = CharacterNgramEmbedder::default();

    match cli.command {
        Command::Index {
            folder,
            config_dir,
            formats,
            strategy,
            analysis_url,
            analysis_api_key,
        } => {
            let config = ExperimentConfig::load(Path::new(&config_dir))
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let strategy = match strategy.as_str() {
                "basic" => ChunkingStrategy::Basic,
                "document-intelligence" => ChunkingStrategy::DocumentIntelligence,
                other => anyhow::bail!("unknown chunking strategy: {other}"),
            };

            let allowed = if formats == "all" {
                AllowedFormats::All
            } else {
                AllowedFormats::Named(
                    formats.split(',').map(|name| name.trim().to_string()).collect(),
                )
            };

            let credentials = AnalysisCredentials {
                endpoint: analysis_url,
                api_key: analysis_api_key,
            };

            let index = RestSearchIndex::new(&cli.search_url, embedder.dimensions())
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for &chunk_size in &config.chunk_sizes {
                for &overlap_size in &config.overlap_sizes {
                    let chunks = load_documents(
                        strategy,
                        &credentials,
                        &allowed,
                        Path::new(&folder),
                        chunk_size,
                        overlap_size,
                    )
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                    let embeddings: Vec<_> = chunks
                        .iter()
                        .map(|chunk| embedder.embed(&chunk.content))
                        .collect();

                    for &ef_construction in &config.ef_constructions {
                        for &ef_search in &config.ef_searches {
                            let name = config.index_name(
                                embedder.name(),
                                chunk_size,
                                overlap_size,
                                ef_construction,
                                ef_search,
                            );

                            index
                                .ensure_index(&IndexDefinition {
                                    name: name.clone(),
                                    vector_dimensions: embedder.dimensions(),
                                    ef_construction,
                                    ef_search,
                                })
                                .await
                                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                            index
                                .index_chunks(&name, &chunks, &embeddings)
                                .await
                                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                            info!(index = %name, chunk_count = chunks.len(), "indexed grid point");
                        }
                    }
                }
            }

            println!("indexing finished at {}", Utc::now().to_rfc3339());
        }
        Command::Run { config_dir, output } => {
            let index = RestSearchIndex::new(&cli.search_url, embedder.dimensions())
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let generator = RestResponseGenerator::new(
                &cli.generator_url,
                &cli.generator_deployment,
                cli.generator_api_key.clone(),
            )
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let registry = RestDatasetRegistry::new(&cli.registry_url, None)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let evaluator =
                SimilarityEvaluator::new(CharacterNgramEmbedder::default(), cli.eval_threshold);
            let cross_encoder = LexicalCrossEncoder;
            let output_store = JsonlOutputStore::new(&output);
            let policy = PromptShapePolicy::default();
            let models: Vec<Arc<dyn EmbeddingModel>> =
                vec![Arc::new(CharacterNgramEmbedder::default())];

            let runner = ExperimentRunner {
                client: &index,
                generator: &generator,
                evaluator: &evaluator,
                cross_encoder: &cross_encoder,
                output_store: &output_store,
                dataset_registry: &registry,
                question_policy: &policy,
                embedding_models: &models,
            };

            runner
                .run(Path::new(&config_dir))
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("sweep finished at {}", Utc::now().to_rfc3339());
        }
    }

    Ok(())
}
