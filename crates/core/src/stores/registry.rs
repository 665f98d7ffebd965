use crate::error::QueryError;
use crate::traits::DatasetRegistry;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the dataset catalog each grid point's artifact is
/// registered with.
pub struct RestDatasetRegistry {
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl RestDatasetRegistry {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, QueryError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key,
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }
}

#[async_trait]
impl DatasetRegistry for RestDatasetRegistry {
    async fn register(&self, name: &str) -> Result<(), QueryError> {
        let mut request = self
            .client
            .post(self.endpoint.join("datasets")?)
            .json(&json!({ "name": name }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(QueryError::BackendResponse {
                backend: "dataset-registry".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}
