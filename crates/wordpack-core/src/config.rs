//! Configuration types for the word pack catalog.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordPackConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remote corpus configuration.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Population configuration.
    #[serde(default)]
    pub population: PopulationConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            busy_timeout_ms: 30000,
        }
    }
}

/// Where remote word groups come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; groups live at `<base_url>/languages/<lang>/<group>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Serve groups from this directory instead of HTTP.
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: 10,
            local_dir: None,
        }
    }
}

/// Population configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of local groups prefetching tops each default pack up to.
    #[serde(default = "default_max_local_groups")]
    pub max_local_groups: usize,

    /// Prefetch every default pack when the catalog is opened.
    #[serde(default)]
    pub prefetch_on_start: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_local_groups: 15,
            prefetch_on_start: false,
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_local_groups() -> usize {
    15
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wordpack")
        .join("catalog.db")
}

impl WordPackConfig {
    /// Load configuration from file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::CatalogError::Config {
                message: format!("Failed to parse config: {}", e),
            }
        })?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> crate::error::Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("wordpack").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("wordpack.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WordPackConfig::default();
        assert_eq!(config.population.max_local_groups, 15);
        assert!(!config.population.prefetch_on_start);
        assert_eq!(config.remote.timeout_secs, 10);
        assert!(config.remote.local_dir.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: WordPackConfig = toml::from_str(
            r#"
            [remote]
            base_url = "https://words.example.org"

            [population]
            max_local_groups = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.remote.base_url, "https://words.example.org");
        assert_eq!(config.remote.timeout_secs, 10);
        assert_eq!(config.population.max_local_groups, 4);
        assert!(config.database.wal_mode);
    }
}
