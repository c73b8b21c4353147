use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use {ferry_common::Citation, ferry_config::FeishuConfig};

use crate::{
    auth::{CachedTenantToken, get_tenant_access_token},
    card::answer_card,
    error::Result,
};

/// Response codes meaning the bearer token was rejected; the cached token is
/// dropped so the next send fetches a fresh one.
const INVALID_TOKEN_CODES: &[i64] = &[99_991_661, 99_991_663];

/// Outbound side of the messaging platform, as seen by the relay.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a plain-text message to a user.
    async fn send_text(&self, open_id: &str, text: &str) -> Result<Value>;

    /// Send an answer card with optional source citations.
    async fn send_card(
        &self,
        open_id: &str,
        title: &str,
        body: &str,
        citations: &[Citation],
    ) -> Result<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Interactive,
}

impl MsgType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Interactive => "interactive",
        }
    }
}

/// Feishu open API client owning its tenant-token cache.
pub struct FeishuClient {
    config: FeishuConfig,
    http: reqwest::Client,
    token_cache: Mutex<Option<CachedTenantToken>>,
}

impl FeishuClient {
    pub fn new(config: FeishuConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            token_cache: Mutex::new(None),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/open-apis/im/v1/messages",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Current tenant access token, fetched or refreshed as needed.
    pub async fn tenant_access_token(&self) -> Result<Secret<String>> {
        get_tenant_access_token(&self.http, &self.config, &self.token_cache)
            .await
            .inspect_err(|e| {
                warn!(app_id = %self.config.app_id, "failed to get tenant access token: {e}")
            })
    }

    async fn invalidate_token(&self) {
        let mut guard = self.token_cache.lock().await;
        *guard = None;
    }

    /// Post a message to `receive_id` (an open id) and return the raw API
    /// response. `content` is JSON-encoded into the string field the API
    /// expects.
    pub async fn send_message(
        &self,
        receive_id: &str,
        msg_type: MsgType,
        content: &Value,
    ) -> Result<Value> {
        let token = self.tenant_access_token().await?;
        let body = json!({
            "receive_id": receive_id,
            "msg_type": msg_type.as_str(),
            "content": serde_json::to_string(content)?,
        });

        let resp = self
            .http
            .post(self.messages_url())
            .query(&[("receive_id_type", "open_id")])
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .inspect_err(|e| warn!(receive_id, "Feishu send failed: {e}"))?;
        let status = resp.status();
        let reply: Value = resp.json().await?;

        let code = reply.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code == 0 {
            debug!(receive_id, msg_type = msg_type.as_str(), "Feishu message sent");
        } else {
            let msg = reply.get("msg").and_then(Value::as_str).unwrap_or_default();
            warn!(receive_id, %status, code, msg, "Feishu rejected message");
            if INVALID_TOKEN_CODES.contains(&code) {
                self.invalidate_token().await;
            }
        }
        Ok(reply)
    }
}

#[async_trait]
impl MessageSender for FeishuClient {
    async fn send_text(&self, open_id: &str, text: &str) -> Result<Value> {
        self.send_message(open_id, MsgType::Text, &json!({ "text": text }))
            .await
    }

    async fn send_card(
        &self,
        open_id: &str,
        title: &str,
        body: &str,
        citations: &[Citation],
    ) -> Result<Value> {
        let card = answer_card(title, body, citations);
        self.send_message(open_id, MsgType::Interactive, &card)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {mockito::Matcher, rstest::rstest};

    use super::*;

    const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
    const MESSAGES_PATH: &str = "/open-apis/im/v1/messages";

    fn client(server: &mockito::ServerGuard) -> FeishuClient {
        let config = FeishuConfig {
            app_id: "cli_test".into(),
            app_secret: Secret::new("shh".into()),
            api_base: server.url(),
            ..FeishuConfig::default()
        };
        FeishuClient::new(config, reqwest::Client::new())
    }

    async fn mock_token(server: &mut mockito::ServerGuard, hits: usize) -> mockito::Mock {
        server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"ok","tenant_access_token":"t-abc","expire":7200}"#)
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn send_text_fetches_token_and_encodes_content() {
        let mut server = mockito::Server::new_async().await;
        let token = mock_token(&mut server, 1).await;
        let send = server
            .mock("POST", MESSAGES_PATH)
            .match_query(Matcher::UrlEncoded(
                "receive_id_type".into(),
                "open_id".into(),
            ))
            .match_header("authorization", "Bearer t-abc")
            .match_body(Matcher::Json(json!({
                "receive_id": "ou_123",
                "msg_type": "text",
                "content": "{\"text\":\"hello\"}",
            })))
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"success","data":{"message_id":"om_9"}}"#)
            .expect(2)
            .create_async()
            .await;

        let feishu = client(&server);
        let reply = feishu.send_text("ou_123", "hello").await.unwrap();
        assert_eq!(reply["data"]["message_id"], "om_9");
        // second send reuses the cached token
        feishu.send_text("ou_123", "hello").await.unwrap();

        token.assert_async().await;
        send.assert_async().await;
    }

    #[tokio::test]
    async fn send_card_posts_interactive_message() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let expected_card = answer_card("Answer", "body", &[Citation::new("a.pdf", "3")]);
        let send = server
            .mock("POST", MESSAGES_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "msg_type": "interactive",
                "content": serde_json::to_string(&expected_card).unwrap(),
            })))
            .with_status(200)
            .with_body(r#"{"code":0,"msg":"success"}"#)
            .create_async()
            .await;

        client(&server)
            .send_card("ou_123", "Answer", "body", &[Citation::new("a.pdf", "3")])
            .await
            .unwrap();
        send.assert_async().await;
    }

    #[tokio::test]
    async fn token_failure_means_no_send() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"code":10003,"msg":"invalid app_id"}"#)
            .create_async()
            .await;
        let send = server
            .mock("POST", MESSAGES_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client(&server).send_text("ou_123", "hi").await.unwrap_err();
        assert!(err.to_string().contains("10003"));
        send.assert_async().await;
    }

    #[rstest]
    #[case(99_991_663, 2)]
    #[case(230_002, 1)]
    #[tokio::test]
    async fn rejected_token_is_dropped(#[case] code: i64, #[case] token_fetches: usize) {
        let mut server = mockito::Server::new_async().await;
        let token = mock_token(&mut server, token_fetches).await;
        let _send = server
            .mock("POST", MESSAGES_PATH)
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(json!({ "code": code, "msg": "nope" }).to_string())
            .create_async()
            .await;

        let feishu = client(&server);
        let first = feishu.send_text("ou_123", "a").await.unwrap();
        assert_eq!(first["code"], code);
        feishu.send_text("ou_123", "b").await.unwrap();
        token.assert_async().await;
    }
}
