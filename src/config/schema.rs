//! Configuration schema definitions.
//!
//! This module defines the server-facing slice of the application's
//! configuration. All types derive Serde traits for deserialization from
//! config files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the local web server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// HTTP behavior (debug mode, body limits).
    pub http: HttpConfig,

    /// Static theme resolution.
    pub theme: ThemeConfig,

    /// Owner profile shown in rendered pages.
    pub profile: ProfileConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address. The server is meant for one local instance, so the
    /// default stays on loopback.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:33411".to_string(),
        }
    }
}

/// HTTP behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Verbose debug mode: disables cache negotiation and the
    /// trailing-slash retry, and puts full error detail in 500 bodies.
    /// A trust decision for local development only.
    pub debug: bool,

    /// Maximum accepted size for url-encoded request bodies, in bytes.
    pub post_body_limit: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            debug: false,
            post_body_limit: 5 * 1024 * 1024,
        }
    }
}

/// Static theme resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Default theme directory for static assets.
    pub root: PathBuf,

    /// Per-host theme overrides, keyed by hostname (port stripped).
    pub host_roots: HashMap<String, PathBuf>,
}

impl ThemeConfig {
    /// Resolve the theme directory for a request host.
    pub fn root_for(&self, hostname: &str) -> &Path {
        self.host_roots
            .get(hostname)
            .map(PathBuf::as_path)
            .unwrap_or(&self.root)
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("theme"),
            host_roots: HashMap::new(),
        }
    }
}

/// Owner profile configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Display name exposed to page templates.
    pub display_name: String,

    /// Default page title; templates usually override it.
    pub title: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            display_name: "Anonymous".to_string(),
            title: "Local interface".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stay_on_loopback() {
        let config = ServerConfig::default();
        assert!(config.listener.bind_address.starts_with("127.0.0.1"));
        assert!(!config.http.debug);
    }

    #[test]
    fn theme_root_per_host() {
        let mut config = ThemeConfig::default();
        config
            .host_roots
            .insert("studio.local".to_string(), PathBuf::from("alt-theme"));

        assert_eq!(config.root_for("localhost"), Path::new("theme"));
        assert_eq!(config.root_for("studio.local"), Path::new("alt-theme"));
    }

    #[test]
    fn minimal_toml_parses() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [http]
            debug = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert!(config.http.debug);
        assert_eq!(config.http.post_body_limit, 5 * 1024 * 1024);
    }
}
