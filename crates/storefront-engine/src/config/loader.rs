use super::schema::StorefrontConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./storefront.yaml
    /// 2. ~/.storefront/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<StorefrontConfig, ConfigError> {
        let local_config = PathBuf::from("./storefront.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".storefront").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(StorefrontConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<StorefrontConfig, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: StorefrontConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise the default locations, then
    /// apply environment overrides.
    pub async fn load(path: Option<&Path>) -> Result<StorefrontConfig, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load_from(p).await?,
            None => Self::load_default().await?,
        };
        config.apply_env();
        Ok(config)
    }
}
