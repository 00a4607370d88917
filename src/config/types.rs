// Configuration types module
// Defines all configuration-related data structures

use crate::router::ReloadPolicy;
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub routes: RoutesConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn or error
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Content type for string values returned by handlers
    pub default_content_type: String,
    pub server_name: String,
    pub max_body_size: u64,
}

/// Routes tree configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RoutesConfig {
    /// Directory holding the handler modules
    pub root: String,
    /// Handler module extension, without the dot
    pub extension: String,
    #[serde(default)]
    pub reload: ReloadPolicy,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            root: "./api".to_string(),
            extension: "toml".to_string(),
            reload: ReloadPolicy::Always,
        }
    }
}
