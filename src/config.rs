//! Configuration loading
//!
//! Embedded defaults, then optional files, then `GHRELAY_*` environment
//! variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use ghrelay_adapters::GraphqlHttpConfig;
use ghrelay_core::EngineConfig;
use serde::Deserialize;
use std::time::Duration;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Environment variables consulted for a token when none is configured
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub cli: CliSettings,
    #[serde(default)]
    pub engine: EngineSettings,
}

/// GraphQL API settings
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    pub request_timeout_secs: u64,
}

/// `gh` settings
#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub binary: String,
    pub step_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub environment_ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Configured token, else the first non-blank token variable
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(|key| std::env::var(key).ok())
    }

    fn resolve_token_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let configured = self.github.token.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        TOKEN_ENV_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.cli.binary.clone())
            .with_probe_timeout(Duration::from_millis(self.cli.probe_timeout_ms))
            .with_cli_step_timeout(Duration::from_millis(self.cli.step_timeout_ms))
            .with_environment_ttl(Duration::from_secs(self.cli.environment_ttl_secs))
    }

    pub fn http_config(&self, token: Option<String>) -> GraphqlHttpConfig {
        let config = GraphqlHttpConfig::new(self.github.api_url.clone())
            .with_timeout(Duration::from_secs(self.github.request_timeout_secs));
        match token {
            Some(token) => config.with_token(token),
            None => config,
        }
    }
}

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/local").required(false))
        // prefix_separator("_") so GHRELAY_CLI__BINARY matches, not GHRELAY__CLI__BINARY
        .add_source(
            Environment::with_prefix("GHRELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}
