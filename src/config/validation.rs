use anyhow::{anyhow, Result};

use super::AppConfig;
use crate::model::SortOrder;

/// Configuration validator for ensuring configuration integrity
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        Self::validate_api_config(config)?;
        Self::validate_playlist_config(config)?;
        Self::validate_player_config(config)?;
        Self::validate_database_config(config)?;
        Self::validate_url("share.frontend_url", &config.share.frontend_url)?;
        Ok(())
    }

    fn validate_api_config(config: &AppConfig) -> Result<()> {
        Self::validate_url("api.instance_url", &config.api.instance_url)?;

        if let Some(url) = &config.api.auth_instance_url {
            Self::validate_url("api.auth_instance_url", url)?;
        }

        if let Some(token) = &config.api.auth_token {
            if token.trim().is_empty() {
                return Err(anyhow!("api.auth_token cannot be empty if specified"));
            }
        }

        if config.api.timeout_secs == 0 {
            return Err(anyhow!("api.timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    fn validate_playlist_config(config: &AppConfig) -> Result<()> {
        let index = config.playlist.sort_order;
        if SortOrder::from_index(index).is_none() {
            return Err(anyhow!(
                "playlist.sort_order must be between 0 and 5, got {}",
                index
            ));
        }
        Ok(())
    }

    fn validate_player_config(config: &AppConfig) -> Result<()> {
        for category in &config.player.segment_categories {
            if category.trim().is_empty() {
                return Err(anyhow!("player.segment_categories cannot contain empty names"));
            }
        }
        Ok(())
    }

    fn validate_database_config(config: &AppConfig) -> Result<()> {
        if let Some(db_path) = &config.database.path {
            if db_path.trim().is_empty() {
                return Err(anyhow!("Database path cannot be empty if specified"));
            }
        }
        Ok(())
    }

    /// Only absolute http(s) URLs are accepted
    fn validate_url(field: &str, url: &str) -> Result<()> {
        let url = url.trim();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| anyhow!("{} must start with http:// or https://: {}", field, url))?;

        if rest.is_empty() || rest.starts_with('/') {
            return Err(anyhow!("{} is missing a host: {}", field, url));
        }
        Ok(())
    }
}
