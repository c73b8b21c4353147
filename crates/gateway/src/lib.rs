//! Gateway: HTTP server receiving Feishu event callbacks and relaying
//! questions to the RAGFlow knowledge base.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Build the shared outbound HTTP client and platform clients
//! 3. Start HTTP server (webhook, health, test query)
//!
//! Platform and backend specifics live in `ferry-feishu` and `ferry-ragflow`;
//! this crate only wires them together.

pub mod relay;
pub mod server;
pub mod state;
pub mod webhook;

pub use {
    relay::{IgnoreReason, Relay, RelayOutcome},
    server::{AppState, build_gateway_app, start_gateway},
    state::GatewayState,
};
