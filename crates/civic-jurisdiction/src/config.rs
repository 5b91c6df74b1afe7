//! Engine configuration.

use std::time::Duration;

const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_MAX_PAGE_SIZE: usize = 100;
const DEFAULT_CHAIN_CACHE_CAPACITY: u64 = 10_000;

/// Tunables for the jurisdiction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Whether ticket creation consults the injected classifier at all.
    pub classifier_enabled: bool,

    /// Upper bound on a single classifier or summarizer call.
    pub classifier_timeout: Duration,

    /// Page size used when a listing does not ask for one.
    pub default_page_size: usize,

    /// Largest page size a listing may request.
    pub max_page_size: usize,

    /// Maximum number of resolved ancestor chains kept in memory.
    pub chain_cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classifier_enabled: true,
            classifier_timeout: Duration::from_millis(DEFAULT_CLASSIFIER_TIMEOUT_MS),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            chain_cache_capacity: DEFAULT_CHAIN_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Tests supply variables through this without touching the process
    /// environment.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let classifier_enabled = parse_or(&reader, "CIVIC_CLASSIFIER_ENABLED", true)?;

        let timeout_ms = parse_or(
            &reader,
            "CIVIC_CLASSIFIER_TIMEOUT_MS",
            DEFAULT_CLASSIFIER_TIMEOUT_MS,
        )?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "CIVIC_CLASSIFIER_TIMEOUT_MS".into(),
                "must be greater than zero".into(),
            ));
        }

        let default_page_size = parse_or(&reader, "CIVIC_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if default_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "CIVIC_DEFAULT_PAGE_SIZE".into(),
                "must be greater than zero".into(),
            ));
        }

        let max_page_size = parse_or(&reader, "CIVIC_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;
        if max_page_size < default_page_size {
            return Err(ConfigError::InvalidValue(
                "CIVIC_MAX_PAGE_SIZE".into(),
                format!("must be at least the default page size ({default_page_size})"),
            ));
        }

        let chain_cache_capacity = parse_or(
            &reader,
            "CIVIC_CHAIN_CACHE_CAPACITY",
            DEFAULT_CHAIN_CACHE_CAPACITY,
        )?;

        Ok(Self {
            classifier_enabled,
            classifier_timeout: Duration::from_millis(timeout_ms),
            default_page_size,
            max_page_size,
            chain_cache_capacity,
        })
    }
}

fn parse_or<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(ConfigError::InvalidValue(key.into(), e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
