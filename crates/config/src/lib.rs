//! Configuration loading, validation, env substitution, and env overrides.
//!
//! Config files: `ferry.toml`, `ferry.yaml`, `ferry.yml`, or `ferry.json`
//! Searched in `./` then `~/.config/ferry/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text, and the `FEISHU_*` / `RAGFLOW_*` variables override whatever
//! the file says.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load, load_config,
    },
    schema::{FeishuConfig, FerryConfig, HttpConfig, RagflowConfig, RepliesConfig, ServerConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
