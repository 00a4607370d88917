// Configuration module entry point
// Layers defaults, the optional config file and the environment

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, RoutesConfig};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "fsrouter";

/// Environment variable that overrides `server.port`
const PORT_VAR: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file,
    /// `FSROUTER_*` variables (`FSROUTER_ROUTES__ROOT=./handlers`), `PORT`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::build(config_path, std::env::var(PORT_VAR).ok())
    }

    fn build(config_path: &str, port: Option<String>) -> Result<Self, config::ConfigError> {
        let routes = RoutesConfig::default();

        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.default_content_type", "text/html; charset=utf-8")?
            .set_default("http.server_name", concat!("fsrouter/", env!("CARGO_PKG_VERSION")))?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("routes.root", routes.root)?
            .set_default("routes.extension", routes.extension)?
            .set_default("routes.reload", "always")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FSROUTER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", port)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ReloadPolicy;

    fn missing_file() -> String {
        let dir = tempfile::tempdir().unwrap();
        dir.path().join("absent").to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::build(&missing_file(), None).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.routes.root, "./api");
        assert_eq!(cfg.routes.extension, "toml");
        assert_eq!(cfg.routes.reload, ReloadPolicy::Always);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.http.server_name.starts_with("fsrouter/"));
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_port_override() {
        let cfg = Config::build(&missing_file(), Some("8081".to_string())).unwrap();
        assert_eq!(cfg.server.port, 8081);

        assert!(Config::build(&missing_file(), Some("not-a-port".to_string())).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fsrouter.toml");
        std::fs::write(
            &path,
            "[routes]\nroot = \"./handlers\"\nreload = \"modified\"\n\n[server]\nport = 9000\n",
        )
        .unwrap();
        let base = dir.path().join("fsrouter").to_string_lossy().into_owned();

        let cfg = Config::build(&base, None).unwrap();
        assert_eq!(cfg.routes.root, "./handlers");
        assert_eq!(cfg.routes.reload, ReloadPolicy::Modified);
        assert_eq!(cfg.server.port, 9000);

        let cfg = Config::build(&base, Some("9100".to_string())).unwrap();
        assert_eq!(cfg.server.port, 9100);
    }
}
