use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Default cap on occurrences returned by a single query.
pub const DEFAULT_MAX_OCCURRENCES: u32 = 1000;

/// Default hard cap on raw candidates a single expansion may yield.
pub const DEFAULT_SAFETY_CAP: usize = 1000;

/// Default search horizon for next-occurrence lookups.
pub const DEFAULT_NEXT_OCCURRENCE_HORIZON_DAYS: u32 = 3660;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub default_max_occurrences: u32,
    pub safety_cap: usize,
    pub next_occurrence_horizon_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_occurrences: DEFAULT_MAX_OCCURRENCES,
            safety_cap: DEFAULT_SAFETY_CAP,
            next_occurrence_horizon_days: DEFAULT_NEXT_OCCURRENCE_HORIZON_DAYS,
        }
    }
}

impl EngineConfig {
    /// ## Summary
    /// Returns the next-occurrence horizon as a `chrono::TimeDelta`.
    #[must_use]
    pub fn next_occurrence_horizon(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::days(i64::from(self.next_occurrence_horizon_days))
    }

    /// ## Summary
    /// Checks that every limit is usable by the engine.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if any cap or horizon is zero.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_max_occurrences == 0 {
            return Err(CoreError::ConfigError(
                "engine.default_max_occurrences must be positive".to_string(),
            ));
        }
        if self.safety_cap == 0 {
            return Err(CoreError::ConfigError(
                "engine.safety_cap must be positive".to_string(),
            ));
        }
        if self.next_occurrence_horizon_days == 0 {
            return Err(CoreError::ConfigError(
                "engine.next_occurrence_horizon_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default(
                "engine.default_max_occurrences",
                i64::from(DEFAULT_MAX_OCCURRENCES),
            )?
            .set_default("engine.safety_cap", i64::try_from(DEFAULT_SAFETY_CAP)?)?
            .set_default(
                "engine.next_occurrence_horizon_days",
                i64::from(DEFAULT_NEXT_OCCURRENCE_HORIZON_DAYS),
            )?
            .set_default("logging.level", LoggingConfig::default().level)?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(
        default_max_occurrences = settings.engine.default_max_occurrences,
        safety_cap = settings.engine.safety_cap,
        next_occurrence_horizon_days = settings.engine.next_occurrence_horizon_days,
        "Loaded settings"
    );
    Ok(settings)
}
