use super::StratifyConfig;
use crate::error::{ErrorCode, PipelineError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// `config.toml` in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "stratify", "stratify")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub struct ConfigLoader {
    path: Option<PathBuf>,
    use_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            path: None,
            use_env: true,
        }
    }

    /// Read this file instead of the default location; it must exist
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Defaults, then the file if present, then the environment; validated
    pub async fn load(&self) -> Result<StratifyConfig> {
        let mut config = match &self.path {
            Some(path) => Self::read_file(path).await?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read_file(&path).await?,
                _ => StratifyConfig::default(),
            },
        };

        if self.use_env {
            config.merge_env_vars();
        }
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<StratifyConfig> {
        let content = fs::read_to_string(path).await.map_err(|e| PipelineError::Config {
            code: ErrorCode::CONFIG_NOT_FOUND,
            message: format!("cannot read {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        debug!("Loaded configuration from {}", path.display());
        parse_config(&content)
    }
}

pub fn parse_config(content: &str) -> Result<StratifyConfig> {
    toml::from_str(content).map_err(|e| PipelineError::Config {
        code: ErrorCode::CONFIG_PARSE_ERROR,
        message: format!("invalid configuration: {e}"),
        source: Some(Box::new(e)),
    })
}
