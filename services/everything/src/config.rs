use async_openai::config::OpenAIConfig;
use chrono::NaiveTime;
use everything_core::{HistoryPolicy, SimulationConfig, llm_client::ModelConfig};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub user_name: String,
    pub data_dir: PathBuf,
    pub prompts_path: PathBuf,
    pub log_level: Level,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_api_base = var_or("OPENAI_API_BASE", "https://api.openai.com/v1");

        let defaults = SimulationConfig::default();
        let model = ModelConfig {
            model: var_or("LLM_MODEL", &defaults.model.model),
            max_tokens: parse_var("LLM_MAX_TOKENS", defaults.model.max_tokens)?,
            temperature: parse_var("LLM_TEMPERATURE", defaults.model.temperature)?,
        };

        let simulation = SimulationConfig {
            start_time: parse_time("SIMULATION_START_TIME", defaults.start_time)?,
            end_time: parse_time("SIMULATION_END_TIME", defaults.end_time)?,
            interval_minutes: parse_var("SIMULATION_INTERVAL", defaults.interval_minutes)?,
            recommendation_hours: parse_hours("RECOMMENDATION_HOURS", defaults.recommendation_hours)?,
            model,
            history: parse_history("HISTORY_POLICY")?,
        };
        simulation
            .validate()
            .map_err(|e| ConfigError::InvalidValue("SIMULATION_*".to_string(), e.to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            openai_api_key,
            openai_api_base,
            user_name: var_or("USER_NAME", "Dan"),
            data_dir: PathBuf::from(var_or("DATA_DIR", "./data")),
            prompts_path: PathBuf::from(var_or("PROMPTS_PATH", "./prompts")),
            log_level,
            simulation,
        })
    }

    /// Client configuration for the OpenAI-compatible completion endpoint.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfig::new()
            .with_api_key(&self.openai_api_key)
            .with_api_base(&self.openai_api_base)
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_time(name: &str, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn parse_hours(name: &str, default: Vec<u32>) -> Result<Vec<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|hour| !hour.is_empty())
            .map(|hour| {
                hour.parse::<u32>().map_err(|_| {
                    ConfigError::InvalidValue(name.to_string(), format!("'{}' is not an hour", hour))
                })
            })
            .collect(),
        Err(_) => Ok(default),
    }
}

fn parse_history(name: &str) -> Result<HistoryPolicy, ConfigError> {
    let raw = var_or(name, "accumulate");
    match raw.to_lowercase().as_str() {
        "accumulate" => Ok(HistoryPolicy::Accumulate),
        "reset" => Ok(HistoryPolicy::ResetOnStart),
        _ => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' must be 'accumulate' or 'reset'", raw),
        )),
    }
}
