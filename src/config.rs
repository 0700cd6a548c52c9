//! Handler configuration loader.
//!
//! Loads handler settings from YAML and builds a ready-to-use registry and
//! JSON host from them.
//!
//! ```yaml
//! log_errors: true
//! builtins: true
//! aliases:
//!   Long: Integer
//!   java.lang.String: String
//! server:
//!   host: 127.0.0.1
//!   port: 8080
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::builtins::{standard_codec, StandardTransforms};
use crate::transform_registry::TransformRegistry;
use crate::wire::{JsonCodec, JsonHost};
use crate::workitem::TransformWorkItemHandler;

fn default_true() -> bool {
    true
}

/// Handler configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Also write failures to the error log (they are always reported)
    #[serde(default = "default_true")]
    pub log_errors: bool,

    /// Install the standard scalar transforms and their JSON codecs
    #[serde(default = "default_true")]
    pub builtins: bool,

    /// Extra type names: alias -> existing name, applied in order
    #[serde(default)]
    pub aliases: IndexMap<String, String>,

    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP listener settings for `serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            log_errors: true,
            builtins: true,
            aliases: IndexMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl HandlerConfig {
    /// Load handler configuration from a YAML file.
    ///
    /// # Arguments
    /// * `path` - Path to the YAML file
    ///
    /// # Errors
    /// Returns error if the file can't be read or has invalid format
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        Self::from_yaml_str(&contents)
            .map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Parse handler configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, String> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML: {}", e))
    }

    /// Apply environment overrides.
    ///
    /// `TRANSFORM_LOG_ERRORS` (`true`/`false`) overrides `log_errors`;
    /// `HOST` and `PORT` override the `server` block.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = var("TRANSFORM_LOG_ERRORS") {
            match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => self.log_errors = true,
                "false" | "0" => self.log_errors = false,
                other => tracing::warn!("Ignoring TRANSFORM_LOG_ERRORS={:?}", other),
            }
        }

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring PORT={:?}", port),
            }
        }
        self
    }

    /// Build a registry with the configured transforms and aliases.
    ///
    /// # Errors
    /// Returns error if an alias points at a name the registry doesn't know
    pub fn build_registry(&self) -> Result<TransformRegistry, String> {
        let registry = TransformRegistry::new();

        if self.builtins {
            registry.install(&StandardTransforms);
        }

        for (alias, existing) in &self.aliases {
            registry
                .alias_name(alias, existing)
                .map_err(|e| format!("Invalid alias '{}': {}", alias, e))?;
        }

        tracing::debug!("Registry ready with {} transforms", registry.len());
        Ok(registry)
    }

    /// Build the JSON host used by the CLI and HTTP server.
    pub fn build_host(&self) -> Result<JsonHost, String> {
        let registry = Arc::new(self.build_registry()?);
        let handler = TransformWorkItemHandler::new(registry).with_log_errors(self.log_errors);
        let codec = if self.builtins {
            standard_codec()
        } else {
            JsonCodec::new()
        };

        Ok(JsonHost::new(handler, codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKey;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::from_yaml_str("").unwrap();
        assert!(config.log_errors);
        assert!(config.builtins);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
log_errors: false
aliases:
  Long: Integer
  java.lang.String: String
server:
  host: 127.0.0.1
  port: 9090
"#;
        let config = HandlerConfig::from_yaml_str(yaml).unwrap();

        assert!(!config.log_errors);
        assert!(config.builtins);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        let aliases: Vec<&str> = config.aliases.keys().map(String::as_str).collect();
        assert_eq!(aliases, vec!["Long", "java.lang.String"]);
    }

    #[test]
    fn test_env_overrides_yaml_server() {
        let yaml = "log_errors: true\nserver:\n  host: 127.0.0.1\n  port: 9090\n";
        let env = |name: &str| match name {
            "HOST" => Some("10.0.0.1".to_string()),
            "PORT" => Some("7000".to_string()),
            "TRANSFORM_LOG_ERRORS" => Some("false".to_string()),
            _ => None,
        };

        let config = HandlerConfig::from_yaml_str(yaml)
            .unwrap()
            .with_overrides_from(env);

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert!(!config.log_errors);
    }

    #[test]
    fn test_bad_port_override_ignored() {
        let yaml = "server:\n  port: 9090\n";
        let config = HandlerConfig::from_yaml_str(yaml)
            .unwrap()
            .with_overrides_from(|name| (name == "PORT").then(|| "eighty".to_string()));

        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = HandlerConfig::from_yaml_str("log_errors: [1, 2").unwrap_err();
        assert!(err.contains("Failed to parse YAML"));
    }

    #[test]
    fn test_build_registry_with_aliases() {
        let config = HandlerConfig::from_yaml_str("aliases:\n  Long: Integer\n").unwrap();
        let registry = config.build_registry().unwrap();

        assert_eq!(registry.resolve("Long"), Some(TypeKey::of::<i64>()));
    }

    #[test]
    fn test_alias_to_unknown_type_fails() {
        let config =
            HandlerConfig::from_yaml_str("builtins: false\naliases:\n  Long: Integer\n").unwrap();
        let err = config.build_registry().unwrap_err();

        assert!(err.contains("Long"));
        assert!(err.contains("Unknown type: Integer"));
    }

    #[test]
    fn test_build_host_without_builtins() {
        let config = HandlerConfig::from_yaml_str("builtins: false").unwrap();
        let host = config.build_host().unwrap();

        assert!(host.registry().is_empty());
        assert!(host.codec().is_empty());
    }
}
