use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{error, info, warn},
};

use ferry_config::{FerryConfig, Severity, validate::validate};

use crate::{state::GatewayState, webhook::webhook_handler};

/// Question used by `POST /test` when the body does not supply one.
pub const DEFAULT_TEST_QUESTION: &str = "What is the attendance policy?";

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/health", get(health_handler))
        .route("/test", post(test_query_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { gateway: state })
}

/// Start the gateway HTTP server and serve until interrupted.
pub async fn start_gateway(config: FerryConfig) -> anyhow::Result<()> {
    for d in validate(&config).diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, category = d.category, "config: {}", d.message),
            Severity::Warning => warn!(path = %d.path, category = d.category, "config: {}", d.message),
            Severity::Info => {},
        }
    }

    let listener =
        tokio::net::TcpListener::bind((config.server.bind.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    let state = GatewayState::from_config(config)?;
    let app = build_gateway_app(Arc::clone(&state));

    // Startup banner.
    let config = &state.config;
    let lines = [
        format!("ferry gateway v{}", state.version),
        format!("listening on http://{addr}"),
        format!("feishu app: {}", config.feishu.app_id),
        format!(
            "ragflow: {} (kb {})",
            config.ragflow.endpoint, config.ragflow.kb_id
        ),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Local::now().to_rfc3339(),
        "ragflow_endpoint": state.gateway.knowledge.endpoint(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct TestQueryRequest {
    question: Option<String>,
}

/// `POST /test`: run one knowledge-base query and return the raw result.
async fn test_query_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        TestQueryRequest::default()
    } else {
        match serde_json::from_slice::<TestQueryRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("invalid request body: {e}") })),
                )
                    .into_response();
            },
        }
    };

    let question = request
        .question
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TEST_QUESTION.to_string());
    info!(question = %question, "test query");

    Json(state.gateway.knowledge.query(&question).await).into_response()
}
