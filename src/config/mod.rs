//! Configuration management for searchbridge
//!
//! Loads the service connection settings and process-wide search defaults
//! from a TOML file, then applies environment variable overrides. The
//! resulting [`RuntimeDefaults`] value is constructed once at startup and
//! shared read-only across concurrent calls.

use crate::error::{BridgeError, Result};
use crate::normalize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub defaults: DefaultsConfig,
}

/// Connection settings for the hosted search service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Search service endpoint, e.g. `https://example.search.windows.net`
    pub endpoint: String,
    /// API key credential
    pub api_key: String,
    /// Index name to query
    pub index: String,
    /// REST API version sent on every request
    pub api_version: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index: String::new(),
            api_version: "2024-07-01".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServiceConfig {
    /// Names of the connection settings that are missing.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint.trim().is_empty() {
            missing.push("service.endpoint");
        }
        if self.index.trim().is_empty() {
            missing.push("service.index");
        }
        if self.api_key.trim().is_empty() {
            missing.push("service.api_key");
        }
        missing
    }
}

/// Process-wide search defaults, as written in the configuration file.
///
/// Field lists are delimited strings here; [`RuntimeDefaults`] holds the
/// normalized form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub semantic_configuration: Option<String>,
    pub search_fields: Option<String>,
    pub vector_fields: Option<String>,
    pub select_fields: Option<String>,
    pub query_type: Option<String>,
    pub search_mode: Option<String>,
    pub query_language: Option<String>,
    pub query_rewrites: Option<String>,
    pub debug: Option<String>,
    pub vector_k: Option<u32>,
    pub vector_weight: Option<f64>,
}

/// Resolved process-wide defaults, read-only after startup.
#[derive(Debug, Clone)]
pub struct RuntimeDefaults {
    pub semantic_configuration: Option<String>,
    pub search_fields: Vec<String>,
    pub vector_fields: Vec<String>,
    pub select_fields: Vec<String>,
    pub query_type: Option<String>,
    pub search_mode: String,
    pub query_language: Option<String>,
    pub query_rewrites: String,
    pub debug: Option<String>,
    pub vector_k: u32,
    pub vector_weight: f64,
}

impl Default for RuntimeDefaults {
    fn default() -> Self {
        Self::from_config(&DefaultsConfig::default())
    }
}

impl RuntimeDefaults {
    /// Build the resolved defaults, applying hardcoded fallbacks.
    pub fn from_config(defaults: &DefaultsConfig) -> Self {
        fn non_blank(raw: &Option<String>) -> Option<&str> {
            raw.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty())
        }

        let list = |raw: &Option<String>| -> Vec<String> {
            raw.as_ref()
                .map(|s| {
                    normalize::string_list(Some(&Value::String(s.clone())))
                        .unwrap_or_default()
                })
                .unwrap_or_default()
        };

        Self {
            semantic_configuration: non_blank(&defaults.semantic_configuration)
                .map(str::to_string),
            search_fields: list(&defaults.search_fields),
            vector_fields: list(&defaults.vector_fields),
            select_fields: list(&defaults.select_fields),
            query_type: non_blank(&defaults.query_type).map(str::to_string),
            search_mode: non_blank(&defaults.search_mode)
                .map(str::to_string)
                .unwrap_or_else(|| "all".to_string()),
            query_language: non_blank(&defaults.query_language).map(str::to_string),
            query_rewrites: non_blank(&defaults.query_rewrites)
                .map(str::to_string)
                .unwrap_or_else(|| "generative|count-5".to_string()),
            debug: non_blank(&defaults.debug).map(str::to_string),
            vector_k: defaults.vector_k.unwrap_or(60),
            vector_weight: defaults.vector_weight.unwrap_or(1.0),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| BridgeError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: SEARCHBRIDGE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("SEARCHBRIDGE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        let non_blank = || {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        match path {
            "SERVICE__ENDPOINT" => self.service.endpoint = value.to_string(),
            "SERVICE__API_KEY" => self.service.api_key = value.to_string(),
            "SERVICE__INDEX" => self.service.index = value.to_string(),
            "SERVICE__API_VERSION" => self.service.api_version = value.to_string(),
            "DEFAULTS__SEMANTIC_CONFIGURATION" => {
                self.defaults.semantic_configuration = non_blank();
            }
            "DEFAULTS__SEARCH_FIELDS" => self.defaults.search_fields = non_blank(),
            "DEFAULTS__VECTOR_FIELDS" => self.defaults.vector_fields = non_blank(),
            "DEFAULTS__SELECT_FIELDS" => self.defaults.select_fields = non_blank(),
            "DEFAULTS__QUERY_TYPE" => self.defaults.query_type = non_blank(),
            "DEFAULTS__SEARCH_MODE" => self.defaults.search_mode = non_blank(),
            "DEFAULTS__QUERY_LANGUAGE" => self.defaults.query_language = non_blank(),
            "DEFAULTS__QUERY_REWRITES" => self.defaults.query_rewrites = non_blank(),
            "DEFAULTS__DEBUG" => self.defaults.debug = non_blank(),
            "DEFAULTS__VECTOR_K" => {
                self.defaults.vector_k =
                    Some(value.trim().parse().map_err(|_| {
                        BridgeError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Cannot parse '{}' as integer", value),
                        }
                    })?);
            }
            "DEFAULTS__VECTOR_WEIGHT" => {
                self.defaults.vector_weight =
                    Some(value.trim().parse().map_err(|_| {
                        BridgeError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Cannot parse '{}' as float", value),
                        }
                    })?);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Validate configuration values that have a constrained domain.
    pub fn validate(&self) -> Result<()> {
        if let Some(mode) = self
            .defaults
            .search_mode
            .as_ref()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
        {
            if mode != "any" && mode != "all" {
                return Err(BridgeError::InvalidConfigValue {
                    path: "defaults.search_mode".to_string(),
                    message: format!("must be 'any' or 'all', got '{}'", mode),
                });
            }
        }

        if let Some(k) = self.defaults.vector_k {
            if k == 0 {
                return Err(BridgeError::InvalidConfigValue {
                    path: "defaults.vector_k".to_string(),
                    message: "must be a positive integer".to_string(),
                });
            }
        }

        if let Some(weight) = self.defaults.vector_weight {
            if weight <= 0.0 {
                return Err(BridgeError::InvalidConfigValue {
                    path: "defaults.vector_weight".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BridgeError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("searchbridge").join("config.toml"))
    }
}
