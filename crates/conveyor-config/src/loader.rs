//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, Environment, File};
use conveyor_core::{ConveyorError, ConveyorResult};
use std::path::Path;
use tracing::{debug, info};

/// Loads configuration from layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> ConveyorResult<AppConfig> {
        Self::load("./config")
    }

    /// Loads configuration from the given directory.
    ///
    /// Sources, in override order:
    /// 1. `{dir}/default.toml`
    /// 2. `{dir}/{environment}.toml`
    /// 3. `{dir}/local.toml` (not committed)
    /// 4. Environment variables with the `CONVEYOR__` prefix
    ///    (e.g. `CONVEYOR__DATABASE__URL`)
    pub fn load(config_dir: &str) -> ConveyorResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("no .env file loaded: {e}");
        }

        let environment =
            std::env::var("CONVEYOR_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!(environment = %environment, "loading configuration");

        let mut builder = Config::builder();

        let default_path = format!("{config_dir}/default.toml");
        if Path::new(&default_path).exists() {
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        let env_path = format!("{config_dir}/{environment}.toml");
        if Path::new(&env_path).exists() {
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        let local_path = format!("{config_dir}/local.toml");
        if Path::new(&local_path).exists() {
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONVEYOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| ConveyorError::Configuration(e.to_string()))?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ConveyorError::Configuration(e.to_string()))?;

        app_config.app.environment = environment;

        Self::validate(&app_config)?;

        Ok(app_config)
    }

    /// Rejects configurations that cannot bootstrap.
    fn validate(config: &AppConfig) -> ConveyorResult<()> {
        if config.database.url.is_empty() {
            return Err(ConveyorError::Configuration(
                "database URL is required".to_string(),
            ));
        }

        if config.redis.url.is_empty() {
            return Err(ConveyorError::Configuration(
                "Redis URL is required".to_string(),
            ));
        }

        if config.worker.tick_interval_secs == 0 {
            return Err(ConveyorError::Configuration(
                "worker tick interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
