//! Configuration validation.
//!
//! Flags unknown/misspelled keys in the raw file and runs semantic checks on
//! the resolved config (placeholder credentials, unusable URLs, zero
//! timeouts).

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::schema::FerryConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "credentials", "url", "http",
    /// "security"
    pub category: &'static str,
    /// Dotted path, e.g. "feishu.app_id"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

fn known_sections() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([
        ("server", &["bind", "port"][..]),
        (
            "feishu",
            &[
                "app_id",
                "app_secret",
                "verification_token",
                "encrypt_key",
                "api_base",
            ][..],
        ),
        ("ragflow", &["endpoint", "api_token", "kb_id", "model"][..]),
        (
            "http",
            &["connect_timeout_secs", "request_timeout_secs"][..],
        ),
        ("replies", &["thinking_text", "card_title"][..]),
    ])
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate the raw text of a config file: syntax, unknown keys and value
/// types, dispatched on the file extension.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let mut result = match std::fs::read_to_string(path) {
        Ok(content) => match ext {
            "yaml" | "yml" => validate_yaml_str(&content),
            "json" => validate_json_str(&content),
            _ => validate_toml_str(&content),
        },
        Err(e) => syntax_error(format!("failed to read config file: {e}")),
    };
    result.config_path = Some(path.to_path_buf());
    result
}

fn syntax_error(message: String) -> ValidationResult {
    ValidationResult {
        diagnostics: vec![Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message,
        }],
        config_path: None,
    }
}

fn type_error(message: String) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        category: "type-error",
        path: String::new(),
        message: format!("type error: {message}"),
    }
}

/// Syntax and unknown-key checks on a TOML string.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => return syntax_error(format!("TOML syntax error: {e}")),
    };

    let mut diagnostics = Vec::new();
    if let Ok(serde_json::Value::Object(table)) = serde_json::to_value(&value) {
        check_unknown_fields(&table, &mut diagnostics);
    }

    if let Err(e) = toml::from_str::<FerryConfig>(toml_str) {
        diagnostics.push(type_error(e.to_string()));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Syntax and unknown-key checks on a YAML string.
#[must_use]
pub fn validate_yaml_str(yaml_str: &str) -> ValidationResult {
    match serde_yaml::from_str::<serde_json::Value>(yaml_str) {
        Ok(value) => validate_document(value),
        Err(e) => syntax_error(format!("YAML syntax error: {e}")),
    }
}

/// Syntax and unknown-key checks on a JSON string.
#[must_use]
pub fn validate_json_str(json_str: &str) -> ValidationResult {
    match serde_json::from_str::<serde_json::Value>(json_str) {
        Ok(value) => validate_document(value),
        Err(e) => syntax_error(format!("JSON syntax error: {e}")),
    }
}

/// Unknown-key and type checks shared by the YAML and JSON paths.
fn validate_document(value: serde_json::Value) -> ValidationResult {
    let mut diagnostics = Vec::new();
    // An empty YAML document parses as null and loads as defaults.
    if value.is_null() {
        return ValidationResult::default();
    }
    if let Some(table) = value.as_object() {
        check_unknown_fields(table, &mut diagnostics);
    }
    if let Err(e) = serde_json::from_value::<FerryConfig>(value) {
        diagnostics.push(type_error(e.to_string()));
    }
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    table: &serde_json::Map<String, serde_json::Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let sections = known_sections();
    let section_names: Vec<&str> = sections.keys().copied().collect();

    for (key, child) in table {
        let Some(fields) = sections.get(key.as_str()) else {
            let message = match suggest(key, &section_names, 3) {
                Some(s) => format!("unknown field at top level (did you mean \"{s}\"?)"),
                None => "unknown field at top level".into(),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "unknown-field",
                path: key.clone(),
                message,
            });
            continue;
        };

        let Some(child) = child.as_object() else {
            continue;
        };
        for field in child.keys() {
            if fields.contains(&field.as_str()) {
                continue;
            }
            let message = match suggest(field, fields, 3) {
                Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                None => "unknown field".into(),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "unknown-field",
                path: format!("{key}.{field}"),
                message,
            });
        }
    }
}

/// Semantic checks on a resolved config (after env overrides).
#[must_use]
pub fn validate(config: &FerryConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let defaults = FerryConfig::default();

    let mut placeholder = |path: &str, value: &str, default: &str| {
        if value.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "credentials",
                path: path.into(),
                message: "value is empty".into(),
            });
        } else if value == default {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "credentials",
                path: path.into(),
                message: format!("still set to the placeholder \"{default}\""),
            });
        }
    };

    placeholder(
        "feishu.app_id",
        &config.feishu.app_id,
        &defaults.feishu.app_id,
    );
    placeholder(
        "feishu.app_secret",
        config.feishu.app_secret.expose_secret(),
        defaults.feishu.app_secret.expose_secret(),
    );
    placeholder(
        "feishu.verification_token",
        config.feishu.verification_token.expose_secret(),
        defaults.feishu.verification_token.expose_secret(),
    );
    placeholder(
        "ragflow.api_token",
        config.ragflow.api_token.expose_secret(),
        defaults.ragflow.api_token.expose_secret(),
    );
    if config.ragflow.kb_id.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "credentials",
            path: "ragflow.kb_id".into(),
            message: "knowledge base id is empty".into(),
        });
    }

    for (path, value) in [
        ("ragflow.endpoint", &config.ragflow.endpoint),
        ("feishu.api_base", &config.feishu.api_base),
    ] {
        match url::Url::parse(value) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {},
            Ok(u) => diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "url",
                path: path.into(),
                message: format!("unsupported scheme \"{}\"", u.scheme()),
            }),
            Err(e) => diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "url",
                path: path.into(),
                message: format!("invalid URL \"{value}\": {e}"),
            }),
        }
    }

    if config.http.connect_timeout_secs == 0 || config.http.request_timeout_secs == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "http",
            path: "http".into(),
            message: "timeouts must be at least one second".into(),
        });
    }

    if config.feishu.encrypt_key().is_some() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "security",
            path: "feishu.encrypt_key".into(),
            message: "encrypt_key is set but callbacks are neither decrypted nor \
                      signature-checked; disable encryption in the app console"
                .into(),
        });
    }

    if config.server.port == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "http",
            path: "server.port".into(),
            message: "port 0 binds a random free port".into(),
        });
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {rstest::rstest, secrecy::Secret};

    use super::*;

    fn configured() -> FerryConfig {
        let mut cfg = FerryConfig::default();
        cfg.feishu.app_id = "cli_a1b2c3".into();
        cfg.feishu.app_secret = Secret::new("real-secret".into());
        cfg.feishu.verification_token = Secret::new("v-token".into());
        cfg.ragflow.api_token = Secret::new("ragflow-abc".into());
        cfg
    }

    #[rstest]
    #[case("ragflow", "kbid", Some("kb_id"))]
    #[case("feishu", "app_scret", Some("app_secret"))]
    #[case("server", "listen_address", None)]
    fn unknown_nested_key_flagged(
        #[case] section: &str,
        #[case] key: &str,
        #[case] expected: Option<&str>,
    ) {
        let toml = format!("[{section}]\n{key} = \"x\"\n");
        let result = validate_toml_str(&toml);
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, format!("{section}.{key}"));
        match expected {
            Some(s) => assert!(diag.message.contains(s), "{}", diag.message),
            None => assert_eq!(diag.message, "unknown field"),
        }
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_toml_str("[ragflw]\nkb_id = \"x\"\n");
        assert!(result.has_errors());
        let diag = &result.diagnostics[0];
        assert_eq!(diag.path, "ragflw");
        assert!(diag.message.contains("ragflow"));
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("[server\nport = 1");
        assert_eq!(result.diagnostics[0].category, "syntax");
        assert!(result.has_errors());
    }

    #[test]
    fn wrong_type_detected() {
        let result = validate_toml_str("[server]\nport = \"five thousand\"\n");
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn yaml_unknown_key_flagged() {
        let result = validate_yaml_str("ragflow:\n  kb_idd: kb_hr\nserver:\n  port: 5000\n");
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-field")
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path, "ragflow.kb_idd");
        assert!(unknown[0].message.contains("kb_id"), "{}", unknown[0].message);
    }

    #[test]
    fn json_unknown_section_and_type_error_flagged() {
        let result = validate_json_str(r#"{"feishuu": {}, "server": {"port": "high"}}"#);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "unknown-field" && d.path == "feishuu")
        );
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn yaml_and_json_syntax_errors() {
        assert_eq!(validate_yaml_str("server: [port").diagnostics[0].category, "syntax");
        assert_eq!(validate_json_str("{\"server\":").diagnostics[0].category, "syntax");
    }

    #[test]
    fn validate_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.yml");
        std::fs::write(&path, "replies:\n  card_titel: Answer\n").unwrap();
        let result = validate_file(&path);
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(result.diagnostics[0].path, "replies.card_titel");
    }

    #[test]
    fn defaults_warn_about_placeholders() {
        let result = validate(&FerryConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 4);
    }

    #[test]
    fn configured_is_clean() {
        let result = validate(&configured());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn empty_secret_is_error() {
        let mut cfg = configured();
        cfg.feishu.app_secret = Secret::new(String::new());
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "feishu.app_secret");
    }

    #[test]
    fn bad_endpoint_and_zero_timeout() {
        let mut cfg = configured();
        cfg.ragflow.endpoint = "ftp://rag".into();
        cfg.http.request_timeout_secs = 0;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);
    }

    #[test]
    fn encrypt_key_warns() {
        let mut cfg = configured();
        cfg.feishu.encrypt_key = Some(Secret::new("enc".into()));
        let result = validate(&cfg);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "security");
    }
}
