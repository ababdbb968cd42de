//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `TRACELINK_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_DIR, DEFAULT_ENGINE_TIMEOUT, DEFAULT_SEED};
use crate::engine::EngineConfig;
use crate::oracle::OpenAiConfig;
use crate::store::{CandidateStore, TopK};

/// Run configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `TRACELINK_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one cache file per (classifier kind, model, seed). Default: `./cache`.
    pub cache_dir: PathBuf,

    /// Optional Redis endpoint fronting the local cache files.
    pub redis_url: Option<String>,

    /// Candidates retrieved per source item. Default: `10`.
    pub max_results: TopK,

    /// Overrides the classifier's own pool size when set.
    pub workers: Option<usize>,

    /// Bound on a whole engine run. Default: 24 hours.
    pub timeout: Duration,

    /// Seed handed to the oracle. Default: [`DEFAULT_SEED`].
    pub seed: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            redis_url: None,
            max_results: TopK::default(),
            workers: None,
            timeout: DEFAULT_ENGINE_TIMEOUT,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    const ENV_CACHE_DIR: &'static str = "TRACELINK_CACHE_DIR";
    const ENV_REDIS_URL: &'static str = "TRACELINK_REDIS_URL";
    const ENV_MAX_RESULTS: &'static str = "TRACELINK_MAX_RESULTS";
    const ENV_WORKERS: &'static str = "TRACELINK_WORKERS";
    const ENV_TIMEOUT_SECS: &'static str = "TRACELINK_TIMEOUT_SECS";
    const ENV_SEED: &'static str = "TRACELINK_SEED";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_dir = Self::parse_path_from_env(Self::ENV_CACHE_DIR, defaults.cache_dir);
        let redis_url = Self::parse_optional_string_from_env(Self::ENV_REDIS_URL);
        let max_results = match Self::parse_optional_string_from_env(Self::ENV_MAX_RESULTS) {
            Some(value) => TopK::parse(&value)?,
            None => defaults.max_results,
        };
        let workers = Self::parse_optional_number_from_env::<usize>(Self::ENV_WORKERS)?;
        let timeout = Self::parse_optional_number_from_env::<u64>(Self::ENV_TIMEOUT_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let seed = Self::parse_optional_number_from_env::<u32>(Self::ENV_SEED)?
            .unwrap_or(defaults.seed);

        Ok(Self {
            cache_dir,
            redis_url,
            max_results,
            workers,
            timeout,
            seed,
        })
    }

    /// Validates basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.cache_dir.clone(),
            });
        }

        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }

    /// Engine pool size and run bound.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(self)
    }

    /// Empty retrieval store returning at most `max_results` candidates per query.
    pub fn target_store(&self) -> CandidateStore {
        CandidateStore::retrieval(self.max_results)
    }

    /// Oracle client settings seeded with this run's seed.
    pub fn oracle_config(&self) -> OpenAiConfig {
        OpenAiConfig::from_env(self.seed)
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_optional_number_from_env<T>(var_name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr<Err = ParseIntError>,
    {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            None => Ok(None),
        }
    }
}
