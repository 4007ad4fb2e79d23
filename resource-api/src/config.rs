//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: RESOURCE_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/resource-api/{service_name}/config.toml
//! 4. System directory: /etc/resource-api/{service_name}/config.toml
//! 5. Default values
//!
//! # Example
//!
//! ```toml
//! [service]
//! name = "articles"
//! log_level = "debug"
//!
//! [controller]
//! default_limit = 25
//! max_limit = 500
//! filter_fields = ["type", "deleted", "author"]
//! soft_delete = true
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory prefix used under XDG and /etc
const CONFIG_PREFIX: &str = "resource-api";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Resource controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

/// Behaviour of a resource controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Offset used when the request gives none
    #[serde(default)]
    pub default_offset: u64,

    /// Page size used when the request gives none
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Upper bound for the page size, unbounded when unset
    #[serde(default)]
    pub max_limit: Option<u64>,

    /// Fields that may be filtered on through the `filter` parameter
    #[serde(default = "default_filter_fields")]
    pub filter_fields: Vec<String>,

    /// Document field matched by date-range statistics
    #[serde(default = "default_date_field")]
    pub date_field: String,

    /// Route `DELETE /{id}` to a soft delete instead of a removal
    #[serde(default)]
    pub soft_delete: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_offset: 0,
            default_limit: default_limit(),
            max_limit: None,
            filter_fields: default_filter_fields(),
            date_field: default_date_field(),
            soft_delete: false,
        }
    }
}

impl ControllerConfig {
    /// Allow filtering on an additional field
    #[must_use]
    pub fn with_filter_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.filter_fields.contains(&field) {
            self.filter_fields.push(field);
        }
        self
    }

    /// Make `DELETE /{id}` a soft delete
    #[must_use]
    pub fn with_soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }
}

fn default_service_name() -> String {
    CONFIG_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_limit() -> u64 {
    100
}

fn default_filter_fields() -> Vec<String> {
    vec!["type".to_string(), "deleted".to_string()]
}

fn default_date_field() -> String {
    "date".to_string()
}

impl Config {
    /// Load configuration, naming the service after the running binary
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let defaults = Config {
            service: ServiceConfig {
                name: service_name.to_string(),
                ..ServiceConfig::default()
            },
            ..Config::default()
        };
        let mut figment = Figment::new().merge(Serialized::defaults(defaults));

        // Lowest priority first
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("RESOURCE_").split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories. Environment variables
    /// still override the file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RESOURCE_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Ok(path) = xdg_dirs.place_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}
