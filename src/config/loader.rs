//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the
//! `config` crate, later sources overriding earlier ones:
//!
//! 1. `medal_workflow.yaml` (required)
//! 2. `medal_workflow.<environment>.yaml` (optional)
//! 3. `MEDAL_WORKFLOW__<SECTION>__<FIELD>` environment variables; list fields
//!    such as `workflow.tags` take comma-separated values

use super::error::{ConfigResult, ConfigurationError};
use super::WorkflowConfig;
use config::{Config, Environment, File, Map};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_NAMES: [&str; 2] = ["medal_workflow.yaml", "medal_workflow.yml"];
const ENV_PREFIX: &str = "MEDAL_WORKFLOW";

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: WorkflowConfig,
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
            "Loading configuration"
        );

        let base_file = Self::find_config_file(&config_directory)?;
        let override_file = config_directory.join(format!("medal_workflow.{environment}.yaml"));

        let layered = Config::builder()
            .add_source(File::from(base_file.as_path()))
            .add_source(File::from(override_file.as_path()).required(false))
            .add_source(Self::environment_overrides(None))
            .build()
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))?;

        let config: WorkflowConfig = layered
            .try_deserialize()
            .map_err(ConfigurationError::deserialization_error)?;

        config.validate()?;

        info!(
            environment = %environment,
            workflow = %config.workflow.name,
            output_table = %config.output.qualified_table(),
            override_applied = override_file.exists(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (validated here)
    pub fn from_config(config: WorkflowConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// `MEDAL_WORKFLOW__*` variables, read from `source` instead of the
    /// process environment when given
    fn environment_overrides(source: Option<Map<String, String>>) -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("workflow.tags")
            .source(source)
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        crate::logging::get_environment().to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        std::env::var("MEDAL_WORKFLOW_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in BASE_FILE_NAMES {
            let config_path = config_directory.join(name);
            if config_path.is_file() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
            searched_paths.push(config_path);
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }
}
