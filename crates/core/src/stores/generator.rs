use crate::error::QueryError;
use crate::traits::ResponseGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// REST client for the response-generation service. Server-side errors
/// and throttling surface as transient failures so the pipeline's single
/// retry applies.
pub struct RestResponseGenerator {
    endpoint: Url,
    deployment: String,
    api_key: Option<String>,
    client: Client,
}

impl RestResponseGenerator {
    pub fn new(
        endpoint: &str,
        deployment: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            deployment: deployment.into(),
            api_key,
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }
}

#[async_trait]
impl ResponseGenerator for RestResponseGenerator {
    async fn generate_response(
        &self,
        instruction: &str,
        prompt: &str,
    ) -> Result<String, QueryError> {
        let body = json!({
            "model": self.deployment,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": prompt},
            ],
        });

        let mut request = self
            .client
            .post(self.endpoint.join("chat/completions")?)
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(QueryError::Transient(format!(
                "response generation returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(QueryError::BackendResponse {
                backend: "response-generator".to_string(),
                details: status.to_string(),
            });
        }

        let payload: Value = response.json().await?;
        extract_completion(&payload).ok_or_else(|| QueryError::BackendResponse {
            backend: "response-generator".to_string(),
            details: "payload had no completion text".to_string(),
        })
    }
}

fn extract_completion(payload: &Value) -> Option<String> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/text").and_then(Value::as_str))
        .map(|text| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_shaped_payload_yields_message_content() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "an answer"}}]
        });
        assert_eq!(extract_completion(&payload).as_deref(), Some("an answer"));
    }

    #[test]
    fn bare_text_payload_is_accepted_as_fallback() {
        let payload = json!({"text": "plain completion"});
        assert_eq!(extract_completion(&payload).as_deref(), Some("plain completion"));
    }

    #[test]
    fn missing_completion_is_none() {
        assert!(extract_completion(&json!({"choices": []})).is_none());
    }
}
