//! Gateway settings persistence.
//!
//! Stores operator preferences in ~/.arn-gateway/settings.json.
//! Settings are resolved with env var > settings.json > default priority
//! (see [`crate::config`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::did::DEFAULT_CHAIN_ID;

/// Operator settings persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Chain assumed when an identifier carries none.
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSettings,

    /// Registry indexer API.
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// Identifier parsing behavior.
    #[serde(default)]
    pub identifiers: IdentifierSettings,

    /// JSON template served (with agentId/chainId stamped in) by the
    /// session-package route. None = route disabled.
    #[serde(default)]
    pub session_package_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_chain_id: default_chain_id(),
            server: ServerSettings::default(),
            upstream: UpstreamSettings::default(),
            identifiers: IdentifierSettings::default(),
            session_package_path: None,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Registry indexer API settings. The API key is env-only
/// (`ARN_UPSTREAM_API_KEY`) and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    #[serde(default = "default_upstream_url")]
    pub base_url: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

/// Identifier parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierSettings {
    /// Read an unparseable `did:8004` agent id as 0 instead of rejecting
    /// the identifier. Existing producers rely on this.
    #[serde(default = "default_true")]
    pub lenient_agent_id: bool,
}

impl Default for IdentifierSettings {
    fn default() -> Self {
        Self {
            lenient_agent_id: true,
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID.get()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:4000/".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Get the default settings file path (~/.arn-gateway/settings.json).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".arn-gateway")
            .join("settings.json")
    }

    /// Load settings from a specific path. A missing file yields defaults;
    /// an unreadable one is logged and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    fn to_json(&self) -> Result<Value, String> {
        serde_json::to_value(self).map_err(|e| format!("Failed to serialize settings: {e}"))
    }

    /// Value of a leaf setting by dotted path (e.g. `server.port`).
    pub fn get(&self, path: &str) -> Option<String> {
        let json = self.to_json().ok()?;
        leaf(&json, path).map(render)
    }

    /// Set a leaf setting by dotted path. `value` is read according to the
    /// type the setting already has; `null` clears optional strings.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), String> {
        let mut json = self.to_json()?;
        let slot = leaf_mut(&mut json, path).ok_or_else(|| format!("Unknown setting: {path}"))?;

        *slot = match &*slot {
            Value::Bool(_) => value
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| format!("Expected boolean for {path}, got '{value}'"))?,
            Value::Number(_) => value
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| format!("Expected integer for {path}, got '{value}'"))?,
            _ if value == "null" => Value::Null,
            _ => Value::String(value.to_string()),
        };
        self.apply(json)
    }

    /// Put one setting back to its built-in default.
    pub fn reset(&mut self, path: &str) -> Result<(), String> {
        let defaults = Self::default().to_json()?;
        let default = leaf(&defaults, path)
            .cloned()
            .ok_or_else(|| format!("Unknown setting: {path}"))?;

        let mut json = self.to_json()?;
        if let Some(slot) = leaf_mut(&mut json, path) {
            *slot = default;
        }
        self.apply(json)
    }

    /// Every leaf setting as `(dotted path, value)`, sorted by path.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Ok(json) = self.to_json() {
            flatten(&json, "", &mut entries);
        }
        entries.sort();
        entries
    }

    fn apply(&mut self, json: Value) -> Result<(), String> {
        *self = serde_json::from_value(json).map_err(|e| format!("Failed to apply setting: {e}"))?;
        Ok(())
    }
}

fn pointer(path: &str) -> String {
    format!("/{}", path.replace('.', "/"))
}

/// Sections are not settings; only scalars and nulls are addressable.
fn leaf<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    json.pointer(&pointer(path)).filter(|v| !v.is_object())
}

fn leaf_mut<'a>(json: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    json.pointer_mut(&pointer(path)).filter(|v| !v.is_object())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn flatten(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    let Value::Object(fields) = value else {
        out.push((prefix.to_string(), render(value)));
        return;
    };
    for (key, child) in fields {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten(child, &path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_setting() {
        let settings = Settings::default();

        assert_eq!(settings.get("default_chain_id"), Some("11155111".to_string()));
        assert_eq!(settings.get("server.port"), Some("3000".to_string()));
        assert_eq!(
            settings.get("identifiers.lenient_agent_id"),
            Some("true".to_string())
        );
        assert_eq!(settings.get("session_package_path"), Some("null".to_string()));
        assert_eq!(settings.get("nonexistent"), None);
    }

    #[test]
    fn test_set_setting() {
        let mut settings = Settings::default();

        settings.set("server.host", "0.0.0.0").unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");

        settings.set("default_chain_id", "84532").unwrap();
        assert_eq!(settings.default_chain_id, 84532);

        settings.set("identifiers.lenient_agent_id", "false").unwrap();
        assert!(!settings.identifiers.lenient_agent_id);

        settings
            .set("session_package_path", "/etc/arn/session.json")
            .unwrap();
        assert_eq!(
            settings.session_package_path.as_deref(),
            Some("/etc/arn/session.json")
        );
        settings.set("session_package_path", "null").unwrap();
        assert_eq!(settings.session_package_path, None);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set("server.port", "eighty").is_err());
        assert!(settings.set("server.port", "70000").is_err());
        assert!(settings.set("identifiers.lenient_agent_id", "maybe").is_err());
        assert!(settings.set("server.nope", "1").is_err());
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_reset_setting() {
        let mut settings = Settings::default();

        settings.server.port = 8080;
        settings.reset("server.port").unwrap();
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_reset_optional_and_unknown() {
        let mut settings = Settings::default();
        settings.session_package_path = Some("/tmp/session.json".to_string());
        settings.reset("session_package_path").unwrap();
        assert_eq!(settings.session_package_path, None);

        assert!(settings.reset("server").is_err());
        assert!(settings.reset("server.nope").is_err());
    }

    #[test]
    fn test_list_settings() {
        let settings = Settings::default();
        let list = settings.list();

        assert!(list.iter().any(|(k, _)| k == "upstream.base_url"));
        assert!(list.iter().any(|(k, _)| k == "upstream.timeout_secs"));
        assert!(list.iter().any(|(k, v)| k == "default_chain_id" && v == "11155111"));
        assert!(list.iter().any(|(k, v)| k == "session_package_path" && v == "null"));
        assert!(!list.iter().any(|(k, _)| k == "server"));
        assert!(list.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_sections_are_not_settings() {
        let mut settings = Settings::default();
        assert_eq!(settings.get("server"), None);
        assert!(settings.set("server", "x").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.upstream.base_url = "https://indexer.example.com/".to_string();
        settings.identifiers.lenient_agent_id = false;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.upstream.base_url, "https://indexer.example.com/");
        assert!(!loaded.identifiers.lenient_agent_id);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9000}}"#).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.server.host, "127.0.0.1");
        assert_eq!(loaded.default_chain_id, 11_155_111);
    }

    #[test]
    fn test_missing_or_malformed_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Settings::load_from(&dir.path().join("absent.json"));
        assert_eq!(missing.server.port, 3000);

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path).server.port, 3000);
    }
}
