use std::time::Instant;

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    tracing::{debug, warn},
};

use ferry_config::RagflowConfig;

use crate::{
    error::{Error, Result},
    types::{ChatCompletionRequest, ChatCompletionResponse, QueryResult},
};

/// Something that can answer a question from a knowledge base.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ask one question. Failures are reported in the result, never as a
    /// panic or error.
    async fn query(&self, question: &str) -> QueryResult;

    /// Base URL of the backend, for health output.
    fn endpoint(&self) -> &str;
}

pub struct RagflowClient {
    config: RagflowConfig,
    http: reqwest::Client,
}

impl RagflowClient {
    pub fn new(config: RagflowConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn completions_url(&self) -> String {
        format!(
            "{}/api/v1/chats_openai/{}/chat/completions",
            self.config.endpoint.trim_end_matches('/'),
            self.config.kb_id
        )
    }

    /// The status is checked before the body is decoded, so a 4xx/5xx reply
    /// reports its status and body even when the body is JSON.
    async fn request(&self, question: &str) -> Result<ChatCompletionResponse> {
        let body = ChatCompletionRequest::single_turn(&self.config.model, question);
        let resp = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.config.api_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl KnowledgeBase for RagflowClient {
    async fn query(&self, question: &str) -> QueryResult {
        let started = Instant::now();
        let result = match self.request(question).await {
            Ok(response) => QueryResult::from_response(&response),
            Err(e) => {
                warn!(kb_id = %self.config.kb_id, "RAGFlow query failed: {e}");
                QueryResult::failure(e.to_string())
            },
        };
        debug!(
            kb_id = %self.config.kb_id,
            success = result.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "RAGFlow query finished"
        );
        result
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
