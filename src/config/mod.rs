use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod validation;

use crate::model::SortOrder;
use validation::ConfigValidator;

const APP_DIR: &str = "tubefeed";
const DEFAULT_INSTANCE_URL: &str = "https://pipedapi.kavin.rocks";
const DEFAULT_FRONTEND_URL: &str = "https://piped.video";

fn default_timeout_secs() -> u64 {
    30
}

fn default_segment_categories() -> Vec<String> {
    vec!["sponsor".to_string()]
}

/// Main application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub instance_url: String,
    /// Instance holding the user's account, defaults to `instance_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_instance_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            instance_url: DEFAULT_INSTANCE_URL.to_string(),
            auth_instance_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Playlist screen preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Persisted sort choice, 0..=5 (see [`SortOrder::from_index`])
    #[serde(default)]
    pub sort_order: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Skippable segment categories to request; empty disables the lookup
    #[serde(default = "default_segment_categories")]
    pub segment_categories: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            segment_categories: default_segment_categories(),
        }
    }
}

/// Database configuration settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Web frontend that share links point at
    pub frontend_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file or create with defaults
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let default_config = Self::default();
            default_config.save_to_file(config_path).with_context(|| {
                format!(
                    "Failed to create default configuration file at: {}",
                    config_path.display()
                )
            })?;

            tracing::info!("Created default configuration file at: {}", config_path.display());
            Ok(default_config)
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let content = std::fs::read_to_string(config_path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", config_path.as_ref().display())
        })?;

        let config: AppConfig = toml::from_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", config_path.as_ref().display())
        })?;

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let body = toml::to_string_pretty(self)
            .context("Failed to serialize configuration to TOML")?;
        let content = format!(
            "# tubefeed configuration\n# playlist.sort_order: 0/1 arrival, 2/3 duration, 4/5 title (ascending/descending)\n\n{}",
            body
        );

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// `<config dir>/tubefeed/config.toml`, falling back to the working directory
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Get the database file path, using the platform data directory if not specified
    pub fn get_database_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) => PathBuf::from(path),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bookmarks.db"),
        }
    }

    /// Stored sort preference; out-of-range values fall back to arrival order
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_index(self.playlist.sort_order).unwrap_or_default()
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.playlist.sort_order = order.to_index();
    }
}
