use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::FerryConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["ferry.toml", "ferry.yaml", "ferry.yml", "ferry.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<FerryConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Resolve the effective configuration.
///
/// An explicit path must load; otherwise the standard locations are searched
/// and a missing or broken file falls back to defaults. Environment overrides
/// are applied last in both cases.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<FerryConfig> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    Ok(apply_env_overrides(config))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ferry.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/ferry/ferry.{toml,yaml,yml,json}` (user-global)
///
/// Returns `FerryConfig::default()` if no config file is found.
pub fn discover_and_load() -> FerryConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    FerryConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/ferry/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ferry").map(|d| d.config_dir().to_path_buf())
}

/// Apply the `FEISHU_*` / `RAGFLOW_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: FerryConfig) -> FerryConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: FerryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> FerryConfig {
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = get("FEISHU_APP_ID") {
        config.feishu.app_id = v;
    }
    if let Some(v) = get("FEISHU_APP_SECRET") {
        config.feishu.app_secret = Secret::new(v);
    }
    if let Some(v) = get("FEISHU_VERIFICATION_TOKEN") {
        config.feishu.verification_token = Secret::new(v);
    }
    if let Some(v) = get("FEISHU_ENCRYPT_KEY") {
        config.feishu.encrypt_key = Some(Secret::new(v));
    }
    if let Some(v) = get("RAGFLOW_API_ENDPOINT") {
        config.ragflow.endpoint = v;
    }
    if let Some(v) = get("RAGFLOW_API_TOKEN") {
        config.ragflow.api_token = Secret::new(v);
    }
    if let Some(v) = get("RAGFLOW_KB_ID") {
        config.ragflow.kb_id = v;
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<FerryConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
