use crate::embeddings::EmbeddingModel;
use crate::error::QueryError;
use crate::models::{EvaluationRecord, SearchParameters};
use crate::rerank::{rerank_documents, RerankSettings};
use crate::search::{query_index, SearchVariant};
use crate::traits::{CrossEncoder, Evaluator, ResponseGenerator, SearchIndex};
use chrono::Utc;
use std::future::Future;
use tracing::warn;

/// Everything one query execution needs: the collaborators plus the grid
/// coordinates being exercised.
pub struct PipelineContext<'a> {
    pub client: &'a dyn SearchIndex,
    pub embedding_model: &'a dyn EmbeddingModel,
    pub generator: &'a dyn ResponseGenerator,
    pub evaluator: &'a dyn Evaluator,
    pub cross_encoder: &'a dyn CrossEncoder,
    pub rerank: RerankSettings,
    pub variant: SearchVariant,
    pub top_k: usize,
    pub parameters: SearchParameters,
}

/// One retry is permitted when a collaborator signals a transient
/// failure; anything else escalates immediately.
pub async fn with_transient_retry<T, F, Fut>(operation: F) -> Result<T, QueryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, QueryError>>,
{
    match operation().await {
        Err(QueryError::Transient(reason)) => {
            warn!(%reason, "transient collaborator failure, retrying once");
            operation().await
        }
        other => other,
    }
}

pub fn compose_instruction(main_instruction: &str, context: &[String]) -> String {
    format!("{}\n{}", main_instruction, context.join("\n"))
}

impl PipelineContext<'_> {
    /// Retrieval plus evaluation for a single question: the documents the
    /// evaluator kept and the metrics record tagged with this grid point.
    pub async fn query_and_eval(
        &self,
        query: &str,
        expected_content: &str,
    ) -> Result<(Vec<String>, EvaluationRecord), QueryError> {
        let result = with_transient_retry(|| {
            query_index(
                self.client,
                self.embedding_model,
                &self.parameters.index_name,
                query,
                self.variant,
                self.top_k,
            )
        })
        .await?;

        let (documents, metrics) = self.evaluator.evaluate(&result, expected_content);

        Ok((
            documents,
            EvaluationRecord {
                metrics,
                parameters: self.parameters.clone(),
                evaluated_at: Utc::now(),
            },
        ))
    }

    pub async fn generate_with_retry(
        &self,
        instruction: &str,
        prompt: &str,
    ) -> Result<String, QueryError> {
        with_transient_retry(|| self.generator.generate_response(instruction, prompt)).await
    }

    /// Runs every question through retrieval, evaluation, optional
    /// reranking, and answer synthesis. Questions are independent; only
    /// the returned sequences relate them. Both sequences always have
    /// `questions.len()` entries, and any question's failure fails the
    /// whole aggregation.
    pub async fn answer_questions(
        &self,
        questions: &[String],
        original_prompt: &str,
        output_prompt: &str,
        expected_content: &str,
        main_instruction: &str,
    ) -> Result<(Vec<String>, Vec<EvaluationRecord>), QueryError> {
        let mut answers = Vec::with_capacity(questions.len());
        let mut evaluations = Vec::with_capacity(questions.len());

        for question in questions {
            let (documents, record) = self.query_and_eval(question, expected_content).await?;

            let context = if self.rerank.enabled {
                rerank_documents(
                    &documents,
                    question,
                    output_prompt,
                    &self.rerank,
                    self.generator,
                    self.cross_encoder,
                )
                .await?
            } else {
                documents
            };

            let instruction = compose_instruction(main_instruction, &context);
            let answer = self.generate_with_retry(&instruction, original_prompt).await?;

            answers.push(answer);
            evaluations.push(record);
        }

        Ok((answers, evaluations))
    }
}
