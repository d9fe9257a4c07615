//! Configuration types for the probe run.

use crate::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "probe.toml";

/// Environment variables that override service URLs after the file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEnv {
    /// Base URL of the authentication service.
    AuthUrl,
    /// Base URL of the registry service.
    RegistryUrl,
    /// Base URL of the relay service.
    RelayUrl,
}

impl ServiceEnv {
    /// Returns the canonical environment variable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthUrl => "AUTH_URL",
            Self::RegistryUrl => "REGISTRY_URL",
            Self::RelayUrl => "RELAY_URL",
        }
    }
}

/// Comprehensive configuration for a probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the services live.
    #[serde(default)]
    pub services: ServicesConfig,

    /// API versions used to build endpoint paths.
    #[serde(default)]
    pub api: ApiConfig,

    /// Timeouts and delays.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Which optional cases run.
    #[serde(default)]
    pub suites: SuiteConfig,
}

impl Config {
    /// Load configuration from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| ProbeError::ConfigError(format!("failed to parse config: {}", e)))
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a file, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_with(|name| std::env::var_os(name))?;
        Ok(config)
    }

    /// Apply service URL overrides using the given variable lookup.
    ///
    /// Values must be valid UTF-8 and non-empty; anything else fails closed.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let targets = [
            (ServiceEnv::AuthUrl, &mut self.services.auth_url),
            (ServiceEnv::RegistryUrl, &mut self.services.registry_url),
            (ServiceEnv::RelayUrl, &mut self.services.relay_url),
        ];

        for (var, slot) in targets {
            let name = var.as_str();
            let Some(raw) = lookup(name) else {
                continue;
            };
            let value = raw
                .into_string()
                .map_err(|_| ProbeError::ConfigError(format!("{name} must be valid UTF-8")))?;
            let value = value.trim();
            if value.is_empty() {
                return Err(ProbeError::ConfigError(format!("{name} must not be empty")));
            }
            *slot = value.to_string();
        }
        Ok(())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ProbeError::ConfigError(format!("failed to serialize config: {}", e)))
    }
}

/// Base URLs of the probed services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Authentication service (default: http://localhost:5000).
    pub auth_url: String,

    /// Registry service (default: http://localhost:5001).
    pub registry_url: String,

    /// Relay service; http(s) is rewritten to ws(s) (default: http://localhost:5002).
    pub relay_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:5000".to_string(),
            registry_url: "http://localhost:5001".to_string(),
            relay_url: "http://localhost:5002".to_string(),
        }
    }
}

/// API versions embedded in endpoint paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Authentication API version (default: v0.2.1).
    pub auth_version: String,

    /// Registry API version (default: v0.2.3).
    pub registry_version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_version: "v0.2.1".to_string(),
            registry_version: "v0.2.3".to_string(),
        }
    }
}

/// Timeouts and delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wait before the first case so containers can come up (default: 5).
    pub startup_delay_secs: u64,

    /// Whole-request timeout for HTTP calls (default: 30).
    pub http_timeout_secs: u64,

    /// WebSocket handshake timeout (default: 10000).
    pub connect_timeout_ms: u64,

    /// Per-call receive timeout (default: 10000).
    pub receive_timeout_ms: u64,

    /// Bound on the graceful close handshake (default: 2000).
    pub close_timeout_ms: u64,

    /// How long an unexpectedly opened session may take to be dropped by the
    /// peer and still count as refused (default: 500).
    pub rejection_grace_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: 5,
            http_timeout_secs: 30,
            connect_timeout_ms: 10_000,
            receive_timeout_ms: 10_000,
            close_timeout_ms: 2_000,
            rejection_grace_ms: 500,
        }
    }
}

impl TimeoutConfig {
    /// Returns the startup delay as a Duration.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Returns the HTTP timeout as a Duration.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Returns the handshake timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the receive timeout as a Duration.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Returns the close timeout as a Duration.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Returns the rejection grace period as a Duration.
    pub fn rejection_grace(&self) -> Duration {
        Duration::from_millis(self.rejection_grace_ms)
    }
}

/// Optional suite content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Run allocate/disconnect with a bearer token (default: false).
    pub include_protected_registry: bool,
}
