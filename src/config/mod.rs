//! Layered configuration: built-in defaults, a TOML file, then environment
//! overrides

pub mod loader;

pub use loader::{default_config_path, parse_config, ConfigLoader};

use crate::driver::RolloverPolicy;
use crate::engine::{EngineConfig, TryAgainPolicy};
use crate::error::{ErrorCode, PipelineError, Result};
use crate::state::Allocation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratifyConfig {
    pub capital: f64,
    pub initial_equity_allocation: f64,
    pub data_path: PathBuf,
    pub log_level: String,
    /// Directory for per-run log files; no file is written when unset
    pub log_dir: Option<PathBuf>,
    pub engine: EngineConfig,
    pub rollover: RolloverConfig,
    pub reasoning: ReasoningConfig,
    pub search: SearchConfig,
    pub prices: PriceConfig,
    pub quant: QuantConfig,
    pub cio: CioConfig,
}

impl Default for StratifyConfig {
    fn default() -> Self {
        Self {
            capital: 1000.0,
            initial_equity_allocation: 0.6,
            data_path: PathBuf::from("data/market_data.json"),
            log_level: "info".to_string(),
            log_dir: None,
            engine: EngineConfig::default(),
            rollover: RolloverConfig::default(),
            reasoning: ReasoningConfig::default(),
            search: SearchConfig::default(),
            prices: PriceConfig::default(),
            quant: QuantConfig::default(),
            cio: CioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloverConfig {
    pub policy: RolloverPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            temperature: 0.0,
            max_retries: 2,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SERPER_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub endpoint: String,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_YAHOO_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantConfig {
    pub symbols: Vec<String>,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["SPY".to_string(), "^IRX".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CioConfig {
    /// Run one round of follow-up questions to the analyst and quant
    pub question_reports: bool,
}

impl Default for CioConfig {
    fn default() -> Self {
        Self {
            question_reports: true,
        }
    }
}

impl StratifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting split; bonds take the remainder
    pub fn initial_allocation(&self) -> Allocation {
        Allocation::from_equities(self.initial_equity_allocation)
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply `STRATIFY_*` overrides read through `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(capital) = lookup("STRATIFY_CAPITAL").and_then(|v| v.parse().ok()) {
            self.capital = capital;
        }

        if let Some(equities) =
            lookup("STRATIFY_INITIAL_EQUITY_ALLOCATION").and_then(|v| v.parse().ok())
        {
            self.initial_equity_allocation = equities;
        }

        if let Some(path) = lookup("STRATIFY_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }

        if let Some(level) = lookup("STRATIFY_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(dir) = lookup("STRATIFY_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }

        if let Some(secs) = lookup("STRATIFY_STEP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.engine.step_timeout = Duration::from_secs(secs);
        }

        match lookup("STRATIFY_ON_TRY_AGAIN").as_deref() {
            Some("fail") => self.engine.on_try_again = TryAgainPolicy::Fail,
            Some("complete") => self.engine.on_try_again = TryAgainPolicy::Complete,
            _ => {}
        }

        match lookup("STRATIFY_ROLLOVER_POLICY").as_deref() {
            Some("proposed") => self.rollover.policy = RolloverPolicy::Proposed,
            Some("realized") => self.rollover.policy = RolloverPolicy::Realized,
            _ => {}
        }

        if let Some(model) = lookup("STRATIFY_MODEL") {
            self.reasoning.model = model;
        }

        if let Some(url) = lookup("STRATIFY_OPENAI_BASE_URL") {
            self.reasoning.base_url = url;
        }

        if let Some(key) = lookup("STRATIFY_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.reasoning.api_key = Some(key);
        }

        if let Some(key) = lookup("STRATIFY_SERPER_API_KEY").or_else(|| lookup("SERPER_API_KEY")) {
            self.search.api_key = Some(key);
        }

        if let Some(flag) = lookup("STRATIFY_CIO_QUESTION_REPORTS").and_then(|v| v.parse().ok()) {
            self.cio.question_reports = flag;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.capital.is_finite() || self.capital < 0.0 {
            return Err(invalid(format!(
                "capital must be non-negative, got {}",
                self.capital
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_equity_allocation) {
            return Err(invalid(format!(
                "initial_equity_allocation must be between 0 and 1, got {}",
                self.initial_equity_allocation
            )));
        }
        if self.engine.step_timeout.is_zero() {
            return Err(invalid("engine.step_timeout must be greater than zero"));
        }
        if let Some(tolerance) = self.engine.allocation_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(invalid(format!(
                    "engine.allocation_tolerance must be non-negative, got {tolerance}"
                )));
            }
        }
        if self.reasoning.request_timeout.is_zero() {
            return Err(invalid("reasoning.request_timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::Config {
        code: ErrorCode::CONFIG_INVALID_VALUE,
        message: message.into(),
        source: None,
    }
}
