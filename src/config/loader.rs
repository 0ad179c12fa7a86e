//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Project config (fengshui.toml)
//! 3. Environment variables (FENGSHUI_* prefix, `__` as section separator)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::Path;

use tracing::debug;

use super::types::EngineConfig;
use crate::types::{EngineError, Result};

const PROJECT_CONFIG_FILE: &str = "fengshui.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → project file → env vars
    pub fn load() -> Result<EngineConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(EngineConfig::default()));

        let project_path = Path::new(PROJECT_CONFIG_FILE);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        // e.g. FENGSHUI_STRATEGY__PRIMARY=deepseek -> strategy.primary
        figment = figment.merge(Env::prefixed("FENGSHUI_").split("__").lowercase(true));

        let config: EngineConfig = figment
            .extract()
            .map_err(|e| EngineError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| EngineError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }
}
