//! RAGFlow knowledge-base client.
//!
//! Sends one-shot questions to RAGFlow's OpenAI-compatible chat completions
//! route and turns the response into a [`QueryResult`].

pub mod client;
pub mod error;
pub mod types;

pub use {
    client::{KnowledgeBase, RagflowClient},
    error::{Error, Result},
    types::{NO_ANSWER, QueryResult},
};
