use std::time::{Duration, Instant};

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

use ferry_config::FeishuConfig;

use crate::error::{Error, Result};

/// Feishu hands out two-hour tokens; used when the response omits `expire`.
const DEFAULT_TTL_SECS: u64 = 7200;
/// Re-fetch this long before the token actually expires.
const REFRESH_SKEW: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct CachedTenantToken {
    pub token: Secret<String>,
    pub expires_at: Instant,
}

impl CachedTenantToken {
    pub fn new(token: String, ttl: Duration) -> Self {
        Self {
            token: Secret::new(token),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Instant::now() + REFRESH_SKEW
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    /// Remaining lifetime in seconds.
    expire: Option<u64>,
}

pub fn token_url(api_base: &str) -> String {
    format!(
        "{}/open-apis/auth/v3/tenant_access_token/internal",
        api_base.trim_end_matches('/')
    )
}

/// Return the cached tenant access token, fetching a new one when the cache
/// is empty or the token is about to expire.
///
/// The lock is released during the HTTP exchange, so two concurrent callers
/// may both fetch; the later write wins.
pub async fn get_tenant_access_token(
    client: &reqwest::Client,
    config: &FeishuConfig,
    cache: &Mutex<Option<CachedTenantToken>>,
) -> Result<Secret<String>> {
    {
        let guard = cache.lock().await;
        if let Some(token) = guard.as_ref()
            && token.is_valid()
        {
            return Ok(token.token.clone());
        }
    }

    let body = serde_json::json!({
        "app_id": config.app_id,
        "app_secret": config.app_secret.expose_secret(),
    });
    let resp = client
        .post(token_url(&config.api_base))
        .json(&body)
        .send()
        .await?;
    let status = resp.status();
    let body: TokenResponse = resp.json().await?;

    let token = match body.tenant_access_token {
        Some(token) if body.code == 0 && !token.is_empty() => token,
        _ => {
            warn!(
                app_id = %config.app_id,
                %status,
                code = body.code,
                msg = %body.msg,
                "tenant access token request failed"
            );
            return Err(Error::Auth {
                code: body.code,
                msg: body.msg,
            });
        },
    };

    let ttl = body.expire.unwrap_or(DEFAULT_TTL_SECS).max(120);
    debug!(app_id = %config.app_id, ttl_secs = ttl, "fetched tenant access token");
    let cached = CachedTenantToken::new(token, Duration::from_secs(ttl));
    let token = cached.token.clone();

    let mut guard = cache.lock().await;
    *guard = Some(cached);
    Ok(token)
}
