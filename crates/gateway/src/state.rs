use std::sync::Arc;

use secrecy::ExposeSecret;

use {
    ferry_config::{FerryConfig, HttpConfig},
    ferry_feishu::{FeishuClient, MessageSender},
    ferry_ragflow::{KnowledgeBase, RagflowClient},
};

use crate::relay::Relay;

/// Shared gateway runtime state, wrapped in `Arc` for use across async tasks.
pub struct GatewayState {
    /// Server version string.
    pub version: String,
    /// Loaded configuration.
    pub config: FerryConfig,
    /// Event-to-answer orchestration.
    pub relay: Relay,
    /// Knowledge backend, also used directly by the test-query endpoint.
    pub knowledge: Arc<dyn KnowledgeBase>,
}

impl GatewayState {
    pub fn new(
        config: FerryConfig,
        sender: Arc<dyn MessageSender>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Arc<Self> {
        let relay = Relay::new(sender, Arc::clone(&knowledge), config.replies.clone());
        Arc::new(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            relay,
            knowledge,
        })
    }

    /// Build the live Feishu and RAGFlow clients over one shared HTTP client.
    pub fn from_config(config: FerryConfig) -> reqwest::Result<Arc<Self>> {
        let http = build_http_client(&config.http)?;
        let feishu = FeishuClient::new(config.feishu.clone(), http.clone());
        let ragflow = RagflowClient::new(config.ragflow.clone(), http);
        Ok(Self::new(config, Arc::new(feishu), Arc::new(ragflow)))
    }

    pub fn verification_token(&self) -> &str {
        self.config.feishu.verification_token.expose_secret()
    }
}

/// Outbound client with the configured connect and request timeouts.
pub fn build_http_client(config: &HttpConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
        .build()
}
