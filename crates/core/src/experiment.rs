use crate::aggregate::{compose_instruction, PipelineContext};
use crate::embeddings::EmbeddingModel;
use crate::error::QueryError;
use crate::models::{QueryOutput, SearchParameters};
use crate::rerank::{rerank_documents, RerankSettings, RerankType};
use crate::search::SearchVariant;
use crate::traits::{
    CrossEncoder, DatasetRegistry, Evaluator, OutputStore, QuestionPolicy, ResponseGenerator,
    SearchIndex,
};
use chrono::Utc;
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "config.json";

pub const REFORMULATE_INSTRUCTION: &str = "\
Rewrite the user's prompt into several simpler standalone questions that \
together cover the whole prompt. Respond with one question per line and \
nothing else.";

fn default_rerank_type() -> String {
    "llm".to_string()
}

fn default_llm_rerank_threshold() -> f64 {
    3.0
}

fn default_retrieve_num_of_documents() -> usize {
    10
}

fn default_main_prompt_instruction() -> String {
    "Answer the question using only the provided context.".to_string()
}

/// The declared experiment grid. The cross-product of the list-valued
/// fields drives one retrieval pass per combination, iterated in the
/// declared order of each dimension.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub name_prefix: String,
    pub chunk_sizes: Vec<usize>,
    pub overlap_sizes: Vec<usize>,
    pub embedding_models: Vec<String>,
    pub ef_constructions: Vec<u32>,
    pub ef_searches: Vec<u32>,
    pub search_variants: Vec<String>,
    #[serde(default)]
    pub rerank: bool,
    #[serde(default = "default_rerank_type")]
    pub rerank_type: String,
    #[serde(default = "default_llm_rerank_threshold")]
    pub llm_rerank_threshold: f64,
    #[serde(default = "default_retrieve_num_of_documents")]
    pub retrieve_num_of_documents: usize,
    pub eval_data_path: String,
    #[serde(default = "default_main_prompt_instruction")]
    pub main_prompt_instruction: String,
}

impl ExperimentConfig {
    pub fn load(config_dir: &Path) -> Result<Self, QueryError> {
        let raw = std::fs::read_to_string(config_dir.join(CONFIG_FILE_NAME))?;
        let config: ExperimentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Static validation, run before any external call. Every grid
    /// dimension must be non-empty, every variant and the rerank type
    /// must parse, and every chunk/overlap pairing must leave the window
    /// able to advance.
    pub fn validate(&self) -> Result<(), QueryError> {
        for (field, empty) in [
            ("chunk_sizes", self.chunk_sizes.is_empty()),
            ("overlap_sizes", self.overlap_sizes.is_empty()),
            ("embedding_models", self.embedding_models.is_empty()),
            ("ef_constructions", self.ef_constructions.is_empty()),
            ("ef_searches", self.ef_searches.is_empty()),
            ("search_variants", self.search_variants.is_empty()),
        ] {
            if empty {
                return Err(QueryError::InvalidConfiguration(format!(
                    "{field} must not be empty"
                )));
            }
        }

        for variant in &self.search_variants {
            SearchVariant::parse(variant)?;
        }
        RerankType::parse(&self.rerank_type)?;

        for &chunk_size in &self.chunk_sizes {
            for &overlap_size in &self.overlap_sizes {
                if overlap_size >= chunk_size {
                    return Err(QueryError::InvalidConfiguration(format!(
                        "overlap_size {overlap_size} must be smaller than chunk_size {chunk_size}"
                    )));
                }
            }
        }

        if self.retrieve_num_of_documents == 0 {
            return Err(QueryError::InvalidConfiguration(
                "retrieve_num_of_documents must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn rerank_settings(&self) -> Result<RerankSettings, QueryError> {
        Ok(RerankSettings {
            enabled: self.rerank,
            rerank_type: RerankType::parse(&self.rerank_type)?,
            llm_threshold: self.llm_rerank_threshold,
        })
    }

    /// Deterministic per-grid-point index name.
    pub fn index_name(
        &self,
        model: &str,
        chunk_size: usize,
        overlap_size: usize,
        ef_construction: u32,
        ef_search: u32,
    ) -> String {
        sanitize(&format!(
            "{}-{}-{}-{}-{}-{}",
            self.name_prefix, chunk_size, overlap_size, model, ef_construction, ef_search
        ))
    }
}

fn sanitize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || character == '-' {
                character
            } else {
                '-'
            }
        })
        .collect()
}

/// One line of the evaluation data file: the prompt to answer and the
/// expected output it is judged against.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryDefinition {
    pub user_prompt: String,
    pub output_prompt: String,
}

pub fn load_query_definitions(path: &Path) -> Result<Vec<QueryDefinition>, QueryError> {
    let file = std::fs::File::open(path)?;
    let mut definitions = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        definitions.push(serde_json::from_str(&line)?);
    }
    Ok(definitions)
}

/// Multi-question policy keyed on prompt shape: several question marks or
/// a long prompt suggest a compound information need.
#[derive(Debug, Clone, Copy)]
pub struct PromptShapePolicy {
    pub max_words: usize,
}

impl Default for PromptShapePolicy {
    fn default() -> Self {
        Self { max_words: 40 }
    }
}

impl QuestionPolicy for PromptShapePolicy {
    fn needs_multi_question(&self, prompt: &str) -> bool {
        prompt.matches('?').count() > 1 || prompt.split_whitespace().count() > self.max_words
    }
}

/// Sweeps the experiment grid: for every grid point, answers every query
/// definition, persists each output, and registers the produced dataset.
/// Grid points fail in isolation; configuration errors abort the run.
pub struct ExperimentRunner<'a> {
    pub client: &'a dyn SearchIndex,
    pub generator: &'a dyn ResponseGenerator,
    pub evaluator: &'a dyn Evaluator,
    pub cross_encoder: &'a dyn CrossEncoder,
    pub output_store: &'a dyn OutputStore,
    pub dataset_registry: &'a dyn DatasetRegistry,
    pub question_policy: &'a dyn QuestionPolicy,
    pub embedding_models: &'a [Arc<dyn EmbeddingModel>],
}

impl ExperimentRunner<'_> {
    pub async fn run(&self, config_dir: &Path) -> Result<(), QueryError> {
        let config = ExperimentConfig::load(config_dir)?;
        let rerank = config.rerank_settings()?;
        let definitions = load_query_definitions(&config_dir.join(&config.eval_data_path))?;

        let mut models = Vec::with_capacity(config.embedding_models.len());
        for name in &config.embedding_models {
            let model = self
                .embedding_models
                .iter()
                .find(|model| model.name() == name)
                .cloned()
                .ok_or_else(|| {
                    QueryError::InvalidConfiguration(format!(
                        "embedding model {name} is not registered"
                    ))
                })?;
            models.push((name.clone(), model));
        }

        for (model_name, model) in &models {
            for &chunk_size in &config.chunk_sizes {
                for &overlap_size in &config.overlap_sizes {
                    for &ef_construction in &config.ef_constructions {
                        for &ef_search in &config.ef_searches {
                            for variant_name in &config.search_variants {
                                let variant = SearchVariant::parse(variant_name)?;
                                let parameters = SearchParameters {
                                    embedding_model: model_name.clone(),
                                    chunk_size,
                                    overlap_size,
                                    ef_construction,
                                    ef_search,
                                    search_variant: variant.name().to_string(),
                                    index_name: config.index_name(
                                        model_name,
                                        chunk_size,
                                        overlap_size,
                                        ef_construction,
                                        ef_search,
                                    ),
                                };

                                if let Err(error) = self
                                    .run_grid_point(
                                        &config,
                                        &rerank,
                                        model.as_ref(),
                                        variant,
                                        parameters.clone(),
                                        &definitions,
                                    )
                                    .await
                                {
                                    warn!(
                                        index = %parameters.index_name,
                                        %error,
                                        "grid point failed, continuing sweep"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_grid_point(
        &self,
        config: &ExperimentConfig,
        rerank: &RerankSettings,
        model: &dyn EmbeddingModel,
        variant: SearchVariant,
        parameters: SearchParameters,
        definitions: &[QueryDefinition],
    ) -> Result<(), QueryError> {
        info!(index = %parameters.index_name, "running grid point");

        let pipeline = PipelineContext {
            client: self.client,
            embedding_model: model,
            generator: self.generator,
            evaluator: self.evaluator,
            cross_encoder: self.cross_encoder,
            rerank: rerank.clone(),
            variant,
            top_k: config.retrieve_num_of_documents,
            parameters: parameters.clone(),
        };

        for definition in definitions {
            let (question_variants, answers, evaluations) = if self
                .question_policy
                .needs_multi_question(&definition.user_prompt)
            {
                let questions = self.reformulate_questions(&pipeline, &definition.user_prompt).await?;
                let (answers, evaluations) = pipeline
                    .answer_questions(
                        &questions,
                        &definition.user_prompt,
                        &definition.output_prompt,
                        &definition.output_prompt,
                        &config.main_prompt_instruction,
                    )
                    .await?;
                (questions, answers, evaluations)
            } else {
                let (documents, record) = pipeline
                    .query_and_eval(&definition.user_prompt, &definition.output_prompt)
                    .await?;

                let context = if rerank.enabled {
                    rerank_documents(
                        &documents,
                        &definition.user_prompt,
                        &definition.output_prompt,
                        rerank,
                        self.generator,
                        self.cross_encoder,
                    )
                    .await?
                } else {
                    documents
                };

                let instruction = compose_instruction(&config.main_prompt_instruction, &context);
                let answer = pipeline
                    .generate_with_retry(&instruction, &definition.user_prompt)
                    .await?;

                (
                    vec![definition.user_prompt.clone()],
                    vec![answer],
                    vec![record],
                )
            };

            let output = QueryOutput {
                question_variants,
                final_answer: answers.join("\n"),
                answers,
                rerank: rerank.enabled,
                rerank_type: rerank.enabled.then(|| rerank.rerank_type.name().to_string()),
                evaluations,
                search_parameters: parameters.clone(),
                produced_at: Utc::now(),
            };
            self.output_store.save(&output)?;
        }

        self.dataset_registry.register(&parameters.index_name).await?;
        Ok(())
    }

    /// Original prompt first, then the generator's one-per-line rewrites.
    async fn reformulate_questions(
        &self,
        pipeline: &PipelineContext<'_>,
        prompt: &str,
    ) -> Result<Vec<String>, QueryError> {
        let raw = pipeline
            .generate_with_retry(REFORMULATE_INSTRUCTION, prompt)
            .await?;

        let mut questions = vec![prompt.to_string()];
        questions.extend(
            raw.lines()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(|line| line.to_string()),
        );
        Ok(questions)
    }
}
