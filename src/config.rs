//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/kgconsole/config.toml` (XDG) or platform config dir
//! 2. Project config: `.kgconsole.toml`
//! 3. Environment variables: `KGCONSOLE_*`, nested keys separated by `__`
//!    (e.g. `KGCONSOLE_API__BASE_URL`)
//!
//! # Intended Usage
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [explorer]
//! tenant_ids = ["acme"]
//! depth = 2
//! limit = 100
//! include_implicit = false
//!
//! [layout]
//! direction = "LR"
//! ```
//!
//! Only `api.base_url` is required; everything else falls back to defaults.

use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::graph::Direction;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL all `/api/...` paths are resolved against.
    pub base_url: String,
    /// Per-request timeout. Requests wait indefinitely when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Defaults for search, expansion and suggestions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Tenants searched when none are given explicitly.
    pub tenant_ids: Vec<String>,
    /// Expansion depth (hops).
    pub depth: u32,
    /// Maximum entry points / listed nodes.
    pub limit: u32,
    /// Maximum expanded context nodes per search.
    pub context_limit: u32,
    /// Keep `shared_tag` / `similar` edges in search results.
    pub include_implicit: bool,
    /// Quiet period before a typed query is sent.
    pub debounce_ms: u64,
    pub suggestion_limit: u32,
    /// Page size for the no-query node listing.
    pub page_size: u32,
    /// Parallel per-node edge lookups.
    pub max_concurrent_lookups: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            tenant_ids: Vec::new(),
            depth: 2,
            limit: 100,
            context_limit: 50,
            include_implicit: true,
            debounce_ms: 300,
            suggestion_limit: 10,
            page_size: 100,
            max_concurrent_lookups: 8,
        }
    }
}

impl ExplorerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Layered layout spacing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: Direction,
    /// Distance between neighbours within a rank.
    pub node_spacing: f64,
    /// Distance between consecutive ranks.
    pub rank_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_spacing: 220.0,
            rank_spacing: 140.0,
        }
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment(&Self::user_config_path(), Path::new(".kgconsole.toml"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Build the provider stack from explicit file locations.
    pub fn figment(user_config: &Path, project_config: &Path) -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(project_config))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("KGCONSOLE_").split("__"))
    }

    /// User config path: ~/.config/kgconsole/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("kgconsole").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("kgconsole").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_project_config_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                ".kgconsole.toml",
                r#"
                [api]
                base_url = "http://backend:8000"

                [explorer]
                tenant_ids = ["acme"]
                include_implicit = false
                "#,
            )?;

            let config: Config =
                Config::figment(Path::new("missing-user.toml"), Path::new(".kgconsole.toml"))
                    .extract()?;

            assert_eq!(config.api.base_url, "http://backend:8000");
            assert!(config.api.timeout().is_none());
            assert_eq!(config.explorer.tenant_ids, vec!["acme".to_string()]);
            assert!(!config.explorer.include_implicit);
            assert_eq!(config.explorer.depth, 2);
            assert_eq!(config.explorer.debounce(), Duration::from_millis(300));
            assert_eq!(config.layout.direction, Direction::TopBottom);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_files() {
        Jail::expect_with(|jail| {
            jail.create_file("user.toml", "[api]\nbase_url = \"http://user\"\n")?;
            jail.create_file(
                "project.toml",
                "[api]\nbase_url = \"http://project\"\n[layout]\ndirection = \"LR\"\n",
            )?;
            jail.set_env("KGCONSOLE_API__BASE_URL", "http://env");
            jail.set_env("KGCONSOLE_API__TIMEOUT_SECS", "5");

            let config: Config =
                Config::figment(Path::new("user.toml"), Path::new("project.toml")).extract()?;

            assert_eq!(config.api.base_url, "http://env");
            assert_eq!(config.api.timeout(), Some(Duration::from_secs(5)));
            assert_eq!(config.layout.direction, Direction::LeftRight);
            Ok(())
        });
    }

    #[test]
    fn test_missing_base_url_is_an_error() {
        Jail::expect_with(|_jail| {
            let result: Result<Config, _> =
                Config::figment(Path::new("none.toml"), Path::new("none.toml")).extract();
            assert!(result.is_err());
            Ok(())
        });
    }
}
