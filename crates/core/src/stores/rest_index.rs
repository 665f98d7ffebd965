use crate::error::QueryError;
use crate::models::{Chunk, IndexDefinition, IndexQuery, RetrievedDocument};
use crate::traits::SearchIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Deadline for every call to the search service; these are network
/// bound and must not hang a grid point.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON/REST client for the search service. One instance serves every
/// index of an experiment sweep; the index name travels per call.
pub struct RestSearchIndex {
    endpoint: Url,
    client: Client,
    vector_dimensions: usize,
}

impl RestSearchIndex {
    pub fn new(endpoint: &str, vector_dimensions: usize) -> Result<Self, QueryError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            vector_dimensions,
        })
    }

    fn index_url(&self, index_name: &str) -> Result<Url, QueryError> {
        Ok(self.endpoint.join(&format!("indexes/{index_name}"))?)
    }
}

#[async_trait]
impl SearchIndex for RestSearchIndex {
    async fn ensure_index(&self, definition: &IndexDefinition) -> Result<(), QueryError> {
        if definition.vector_dimensions != self.vector_dimensions {
            return Err(QueryError::Request(format!(
                "configured vector size {} does not match requested {}",
                self.vector_dimensions, definition.vector_dimensions
            )));
        }

        let url = self.index_url(&definition.name)?;
        let response = self.client.head(url.clone()).send().await?;
        if response.status() == StatusCode::OK {
            return Ok(());
        }
        if !response.status().is_client_error() {
            return Err(QueryError::BackendResponse {
                backend: "search-index".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(url)
            .json(&json!({
                "fields": {
                    "content": {"type": "text"},
                    "source_path": {"type": "keyword"},
                    "metadata": {"type": "object"},
                    "embedding": {
                        "type": "dense_vector",
                        "dimensions": definition.vector_dimensions,
                        "hnsw": {
                            "ef_construction": definition.ef_construction,
                            "ef_search": definition.ef_search,
                        }
                    }
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryError::Request(format!(
                "index setup for {} failed with {}",
                definition.name,
                response.status()
            )));
        }

        Ok(())
    }

    async fn index_chunks(
        &self,
        index_name: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), QueryError> {
        if chunks.len() != embeddings.len() {
            return Err(QueryError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut operations = Vec::new();
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            if embedding.len() != self.vector_dimensions {
                return Err(QueryError::Request(format!(
                    "embedding dimension {} != {}",
                    embedding.len(),
                    self.vector_dimensions
                )));
            }

            operations.push(json!({
                "index": {
                    "_index": index_name,
                    "_id": chunk.chunk_id,
                }
            }));
            operations.push(json!({
                "content": chunk.content,
                "source_path": chunk.source_path,
                "metadata": chunk.metadata,
                "embedding": embedding,
            }));
        }

        if operations.is_empty() {
            return Ok(());
        }

        let payload: String = operations
            .into_iter()
            .map(|value| serde_json::to_string(&value))
            .collect::<Result<Vec<_>, serde_json::Error>>()?
            .join("\n")
            + "\n";

        let response = self
            .client
            .post(self.endpoint.join("_bulk")?)
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QueryError::BackendResponse {
                backend: "search-index".to_string(),
                details: response.status().to_string(),
            });
        }
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &IndexQuery,
    ) -> Result<Vec<RetrievedDocument>, QueryError> {
        if let Some(vector) = &query.vector {
            if vector.len() != self.vector_dimensions {
                return Err(QueryError::Request(format!(
                    "query vector dim {} is not {}",
                    vector.len(),
                    self.vector_dimensions
                )));
            }
        }

        let body = build_search_body(query);
        let url = self.endpoint.join(&format!("indexes/{index_name}/_search"))?;
        let response = self.client.post(url).json(&body).send().await?;

        if response.status().is_server_error() {
            return Err(QueryError::Transient(format!(
                "search returned {}",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(QueryError::BackendResponse {
                backend: "search-index".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parse_hits(&parsed))
    }
}

fn build_search_body(query: &IndexQuery) -> Value {
    let mut body = json!({ "size": query.top_k });

    if let Some(text) = &query.text {
        body["query"] = json!({
            "match": { "content": text }
        });
    }
    if let Some(vector) = &query.vector {
        body["knn"] = json!({
            "field": "embedding",
            "vector": vector,
            "k": query.top_k,
        });
    }
    if query.semantic_ranking {
        body["rank"] = json!({ "semantic": true });
    }

    body
}

fn parse_hits(parsed: &Value) -> Vec<RetrievedDocument> {
    let hits = parsed
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut documents = Vec::new();
    for hit in hits {
        let content = hit
            .pointer("/_source/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let score = hit.pointer("/_score").and_then(Value::as_f64).unwrap_or(0.0);
        documents.push(RetrievedDocument { content, score });
    }

    documents
}
