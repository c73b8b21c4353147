//! Shared types and error plumbing used across all ferry crates.

pub mod error;
pub mod types;

pub use {error::FromMessage, types::Citation};
