//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered, later ones winning:
//!
//! 1. `driver-config.yaml` in the configuration directory (required)
//! 2. `driver-config.<environment>.yaml` next to it, when present
//! 3. `DRIVER__`-prefixed environment variables, `__` separating nested keys
//!    (e.g. `DRIVER__EVALUATOR__RELEASE_GRACE_PERIOD_MS=250`)

use super::error::{ConfigResult, ConfigurationError};
use super::DriverConfig;
use ::config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_CONFIG_FILE: &str = "driver-config";
const ENV_PREFIX: &str = "DRIVER";
const CONFIG_DIR_VAR: &str = "DRIVER_CONFIG_DIR";

/// Loaded configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: DriverConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading driver configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            release_grace_period_ms = config.evaluator.release_grace_period_ms,
            heartbeat_sanity_check = config.evaluator.heartbeat_sanity_check,
            reconciliation_window_ms = config.restart.reconciliation_window_ms,
            "🔧 Driver configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already built configuration, e.g. in tests or embedded drivers
    pub fn from_config(config: DriverConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// Detect the current environment
    pub fn detect_environment() -> String {
        env::var("EVALUATOR_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var(CONFIG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<DriverConfig> {
        let base_path = config_directory.join(format!("{BASE_CONFIG_FILE}.yaml"));
        if !base_path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![base_path]));
        }

        let mut builder = Config::builder()
            .add_source(File::from(base_path.clone()).format(FileFormat::Yaml));

        let override_path = config_directory.join(format!("{BASE_CONFIG_FILE}.{environment}.yaml"));
        if override_path.is_file() {
            debug!(
                override_file = %override_path.display(),
                "Applying environment configuration override"
            );
            builder = builder.add_source(File::from(override_path).format(FileFormat::Yaml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| ConfigurationError::invalid_yaml(base_path.display().to_string(), e))?;

        settings
            .try_deserialize::<DriverConfig>()
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_reports_searched_path() {
        let result = ConfigManager::load_from_directory_with_env(
            Some(PathBuf::from("/nonexistent/driver/config")),
            "test",
        );
        match result {
            Err(ConfigurationError::ConfigFileNotFound { searched_paths }) => {
                assert!(searched_paths[0].ends_with("driver-config.yaml"));
            }
            other => panic!("expected ConfigFileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = DriverConfig::default();
        config.events.publisher_capacity = 0;
        assert!(ConfigManager::from_config(config).is_err());

        let manager = ConfigManager::from_config(DriverConfig::default()).unwrap();
        assert_eq!(manager.debug_config()["events"]["publisher_capacity"], 1000);
    }
}
