/// Config schema types (server, feishu, ragflow, http, replies).
use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub server: ServerConfig,
    pub feishu: FeishuConfig,
    pub ragflow: RagflowConfig,
    pub http: HttpConfig,
    pub replies: RepliesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to all interfaces.
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Credentials for the Feishu (Lark) self-built app.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeishuConfig {
    /// App ID from the Feishu open platform console.
    pub app_id: String,

    /// App secret, exchanged together with `app_id` for a tenant access token.
    #[serde(serialize_with = "serialize_secret")]
    pub app_secret: Secret<String>,

    /// Verification token compared against `header.token` on every callback.
    #[serde(serialize_with = "serialize_secret")]
    pub verification_token: Secret<String>,

    /// Event encryption key. Loaded for completeness; callbacks are not
    /// decrypted or signature-checked.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub encrypt_key: Option<Secret<String>>,

    /// Open API base URL. Override for Lark international or tests.
    pub api_base: String,
}

impl std::fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("verification_token", &"[REDACTED]")
            .field(
                "encrypt_key",
                &self.encrypt_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            app_id: "your_app_id".into(),
            app_secret: Secret::new("your_app_secret".into()),
            verification_token: Secret::new("your_token".into()),
            encrypt_key: None,
            api_base: "https://open.feishu.cn".into(),
        }
    }
}

impl FeishuConfig {
    /// Encryption key, treating an empty string as unset.
    pub fn encrypt_key(&self) -> Option<&str> {
        self.encrypt_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }
}

/// RAGFlow knowledge backend.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagflowConfig {
    /// Base URL of the RAGFlow server, without the `/api/v1` suffix.
    pub endpoint: String,

    #[serde(serialize_with = "serialize_secret")]
    pub api_token: Secret<String>,

    /// Chat assistant / knowledge base id used in the completions path.
    pub kb_id: String,

    /// Value sent in the `model` field. RAGFlow ignores it but the
    /// OpenAI-compatible route requires it to be present.
    pub model: String,
}

impl std::fmt::Debug for RagflowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagflowConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &"[REDACTED]")
            .field("kb_id", &self.kb_id)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for RagflowConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".into(),
            api_token: Secret::new("your_ragflow_token".into()),
            kb_id: "kb_001".into(),
            model: "model".into(),
        }
    }
}

/// Outbound HTTP client settings shared by both API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-request timeout. RAGFlow answers can take a while.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User-facing reply texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    /// Sent right after a question is accepted.
    pub thinking_text: String,
    /// Header of the answer card.
    pub card_title: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            thinking_text: "🤔 Searching the knowledge base, please wait...".into(),
            card_title: "Assistant answer".into(),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
