use crate::embeddings::EmbeddingModel;
use crate::error::QueryError;
use crate::models::{IndexQuery, SearchResult};
use crate::traits::SearchIndex;
use serde::{Deserialize, Serialize};

/// Named retrieval strategies. Dispatch is strict: a name outside this
/// table is a configuration error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchVariant {
    Keyword,
    Vector,
    Hybrid,
    Semantic,
}

pub const SEARCH_VARIANTS: [SearchVariant; 4] = [
    SearchVariant::Keyword,
    SearchVariant::Vector,
    SearchVariant::Hybrid,
    SearchVariant::Semantic,
];

impl SearchVariant {
    pub fn name(&self) -> &'static str {
        match self {
            SearchVariant::Keyword => "keyword",
            SearchVariant::Vector => "vector",
            SearchVariant::Hybrid => "hybrid",
            SearchVariant::Semantic => "semantic",
        }
    }

    pub fn parse(name: &str) -> Result<Self, QueryError> {
        SEARCH_VARIANTS
            .iter()
            .copied()
            .find(|variant| variant.name() == name)
            .ok_or_else(|| {
                QueryError::InvalidConfiguration(format!("unknown search variant: {name}"))
            })
    }
}

/// Executes one retrieval pass against the search service, shaping the
/// request according to the variant. Vector-bearing variants embed the
/// query text with the supplied model.
pub async fn query_index(
    client: &dyn SearchIndex,
    embedding_model: &dyn EmbeddingModel,
    index_name: &str,
    query_text: &str,
    variant: SearchVariant,
    top_k: usize,
) -> Result<SearchResult, QueryError> {
    let request = match variant {
        SearchVariant::Keyword => IndexQuery {
            text: Some(query_text.to_string()),
            vector: None,
            top_k,
            semantic_ranking: false,
        },
        SearchVariant::Vector => IndexQuery {
            text: None,
            vector: Some(embedding_model.embed(query_text)),
            top_k,
            semantic_ranking: false,
        },
        SearchVariant::Hybrid => IndexQuery {
            text: Some(query_text.to_string()),
            vector: Some(embedding_model.embed(query_text)),
            top_k,
            semantic_ranking: false,
        },
        SearchVariant::Semantic => IndexQuery {
            text: Some(query_text.to_string()),
            vector: Some(embedding_model.embed(query_text)),
            top_k,
            semantic_ranking: true,
        },
    };

    let documents = client.search(index_name, &request).await?;

    Ok(SearchResult {
        query: query_text.to_string(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::{Chunk, IndexDefinition, RetrievedDocument};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingIndex {
        requests: Mutex<Vec<IndexQuery>>,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn ensure_index(&self, _definition: &IndexDefinition) -> Result<(), QueryError> {
            Ok(())
        }

        async fn index_chunks(
            &self,
            _index_name: &str,
            _chunks: &[Chunk],
            _embeddings: &[Vec<f32>],
        ) -> Result<(), QueryError> {
            Ok(())
        }

        async fn search(
            &self,
            _index_name: &str,
            query: &IndexQuery,
        ) -> Result<Vec<RetrievedDocument>, QueryError> {
            self.requests.lock().unwrap().push(query.clone());
            Ok(vec![RetrievedDocument {
                content: "doc".to_string(),
                score: 1.0,
            }])
        }
    }

    #[test]
    fn unknown_variant_is_a_configuration_error() {
        let result = SearchVariant::parse("search_for_match_sideways");
        assert!(matches!(result, Err(QueryError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn keyword_variant_sends_text_without_vector() {
        let index = RecordingIndex::default();
        let embedder = CharacterNgramEmbedder::default();

        let result = query_index(&index, &embedder, "idx", "what is drift", SearchVariant::Keyword, 5)
            .await
            .unwrap();

        assert_eq!(result.query, "what is drift");
        let requests = index.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text.as_deref(), Some("what is drift"));
        assert!(requests[0].vector.is_none());
        assert!(!requests[0].semantic_ranking);
    }

    #[tokio::test]
    async fn semantic_variant_sends_text_vector_and_ranking_flag() {
        let index = RecordingIndex::default();
        let embedder = CharacterNgramEmbedder::default();

        query_index(&index, &embedder, "idx", "what is drift", SearchVariant::Semantic, 5)
            .await
            .unwrap();

        let requests = index.requests.lock().unwrap();
        assert!(requests[0].text.is_some());
        assert_eq!(
            requests[0].vector.as_ref().map(|vector| vector.len()),
            Some(embedder.dimensions())
        );
        assert!(requests[0].semantic_ranking);
    }
}
