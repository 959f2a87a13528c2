// ABOUTME: Environment-based configuration for the nutrition client, cache, completion service, and loop
// ABOUTME: Every setting has a default; validate() rejects values the pipeline cannot run with
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Environment configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `FDC_API_KEY` | `DEMO_KEY` |
//! | `FDC_BASE_URL` | `https://api.nal.usda.gov/fdc/v1` |
//! | `FDC_TIMEOUT_SECS` | `30` |
//! | `DETAIL_CACHE_URL` | `sqlite:./food_details.db` |
//! | `LLM_BASE_URL` | `https://api.openai.com/v1` |
//! | `LLM_API_KEY` | unset |
//! | `LLM_MODEL` | `gpt-4o-mini` |
//! | `LLM_TIMEOUT_SECS` | `120` |
//! | `RETRY_MAX_ATTEMPTS` | `3` |
//! | `RETRY_BASE_DELAY_MS` | `1000` |
//! | `RETRY_MAX_DELAY_MS` | `60000` |
//! | `OPTIMIZER_MAX_ITERATIONS` | `8` |
//! | `OPTIMIZER_TOLERANCE_RATIO` | `0.05` |
//! | `EVENT_CHANNEL_CAPACITY` | `256` |

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use url::Url;

use crate::constants::completion::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::constants::events::DEFAULT_CHANNEL_CAPACITY;
use crate::constants::nutrition::DEFAULT_FDC_BASE_URL;
use crate::constants::optimizer::{CALORIE_TOLERANCE_RATIO, MAX_ITERATIONS};
use crate::constants::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS};
use crate::external::UsdaClientConfig;
use crate::llm::OpenAiCompatibleConfig;
use crate::optimizer::ConvergenceSettings;
use crate::resilience::RetryPolicy;

/// Default detail cache location
pub const DEFAULT_DETAIL_CACHE_URL: &str = "sqlite:./food_details.db";

/// FoodData Central key that works without registration, heavily rate limited
pub const DEMO_API_KEY: &str = "DEMO_KEY";

/// Completion service settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    /// `OpenAI`-compatible base URL
    pub base_url: String,
    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Whole-request timeout
    pub timeout_secs: u64,
}

/// Retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay_ms: u64,
    /// Cap on any single delay
    pub max_delay_ms: u64,
}

/// Convergence loop settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerConfig {
    /// Adjustment rounds allowed
    pub max_iterations: u32,
    /// Allowed relative deviation from the target
    pub tolerance_ratio: f64,
}

/// Complete runtime configuration
#[derive(Debug, Clone)]
pub struct TunerConfig {
    /// FoodData Central client
    pub food_data: UsdaClientConfig,
    /// Detail cache location (`sqlite:...` or `memory://`)
    pub detail_cache_url: String,
    /// Completion service
    pub completion: CompletionConfig,
    /// Retry policy
    pub retry: RetryConfig,
    /// Convergence loop
    pub optimizer: OptimizerConfig,
    /// Events buffered per subscriber
    pub event_channel_capacity: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            food_data: UsdaClientConfig::default(),
            detail_cache_url: DEFAULT_DETAIL_CACHE_URL.to_owned(),
            completion: CompletionConfig {
                base_url: DEFAULT_BASE_URL.to_owned(),
                api_key: None,
                model: DEFAULT_MODEL.to_owned(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            retry: RetryConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                base_delay_ms: DEFAULT_BASE_DELAY_MS,
                max_delay_ms: DEFAULT_MAX_DELAY_MS,
            },
            optimizer: OptimizerConfig {
                max_iterations: MAX_ITERATIONS,
                tolerance_ratio: CALORIE_TOLERANCE_RATIO,
            },
            event_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl TunerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the result
    /// fails [`Self::validate`]
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let api_key = env_var_or("FDC_API_KEY", DEMO_API_KEY);
        if api_key == DEMO_API_KEY {
            warn!("FDC_API_KEY not set, using the rate-limited {DEMO_API_KEY}");
        }

        let config = Self {
            food_data: UsdaClientConfig {
                api_key,
                base_url: env_var_or("FDC_BASE_URL", DEFAULT_FDC_BASE_URL),
                timeout_secs: parse_env("FDC_TIMEOUT_SECS", 30)?,
            },
            detail_cache_url: env_var_or("DETAIL_CACHE_URL", DEFAULT_DETAIL_CACHE_URL),
            completion: CompletionConfig {
                base_url: env_var_or("LLM_BASE_URL", DEFAULT_BASE_URL),
                api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                model: env_var_or("LLM_MODEL", DEFAULT_MODEL),
                timeout_secs: parse_env("LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            },
            retry: RetryConfig {
                max_attempts: parse_env("RETRY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                base_delay_ms: parse_env("RETRY_BASE_DELAY_MS", DEFAULT_BASE_DELAY_MS)?,
                max_delay_ms: parse_env("RETRY_MAX_DELAY_MS", DEFAULT_MAX_DELAY_MS)?,
            },
            optimizer: OptimizerConfig {
                max_iterations: parse_env("OPTIMIZER_MAX_ITERATIONS", MAX_ITERATIONS)?,
                tolerance_ratio: parse_env("OPTIMIZER_TOLERANCE_RATIO", CALORIE_TOLERANCE_RATIO)?,
            },
            event_channel_capacity: parse_env("EVENT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY)?,
        };

        config.validate()?;
        info!("{}", config.summary());
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.food_data.base_url)
            .with_context(|| format!("Invalid FDC_BASE_URL '{}'", self.food_data.base_url))?;
        Url::parse(&self.completion.base_url)
            .with_context(|| format!("Invalid LLM_BASE_URL '{}'", self.completion.base_url))?;

        if self.food_data.api_key.trim().is_empty() {
            return Err(anyhow!("FDC_API_KEY cannot be empty"));
        }
        if self.detail_cache_url.trim().is_empty() {
            return Err(anyhow!("DETAIL_CACHE_URL cannot be empty"));
        }
        if self.food_data.timeout_secs == 0 || self.completion.timeout_secs == 0 {
            return Err(anyhow!("Request timeouts must be at least one second"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("RETRY_MAX_ATTEMPTS must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(anyhow!(
                "RETRY_BASE_DELAY_MS ({}) cannot exceed RETRY_MAX_DELAY_MS ({})",
                self.retry.base_delay_ms,
                self.retry.max_delay_ms
            ));
        }
        if self.optimizer.max_iterations == 0 {
            return Err(anyhow!("OPTIMIZER_MAX_ITERATIONS must be at least 1"));
        }
        let ratio = self.optimizer.tolerance_ratio;
        if !ratio.is_finite() || ratio <= 0.0 || ratio >= 1.0 {
            return Err(anyhow!(
                "OPTIMIZER_TOLERANCE_RATIO must be between 0 and 1, got {ratio}"
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(anyhow!("EVENT_CHANNEL_CAPACITY must be at least 1"));
        }
        Ok(())
    }

    /// Retry policy described by this configuration
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.retry.max_attempts,
            self.retry.base_delay_ms,
            self.retry.max_delay_ms,
        )
    }

    /// Convergence settings described by this configuration
    #[must_use]
    pub const fn convergence_settings(&self) -> ConvergenceSettings {
        ConvergenceSettings {
            max_iterations: self.optimizer.max_iterations,
            tolerance_ratio: self.optimizer.tolerance_ratio,
        }
    }

    /// Completion client configuration
    #[must_use]
    pub fn completion_client_config(&self) -> OpenAiCompatibleConfig {
        OpenAiCompatibleConfig {
            base_url: self.completion.base_url.clone(),
            api_key: self.completion.api_key.clone(),
            default_model: self.completion.model.clone(),
            timeout_secs: self.completion.timeout_secs,
        }
    }

    /// One-line description with secrets redacted
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Calorie tuner configuration: fdc={} (key {}), cache={}, llm={} model={} (key {}), \
             retry={}x {}..{}ms, optimizer={} rounds within {:.1}%, events={}",
            self.food_data.base_url,
            if self.food_data.api_key == DEMO_API_KEY {
                "demo"
            } else {
                "set"
            },
            self.detail_cache_url,
            self.completion.base_url,
            self.completion.model,
            if self.completion.api_key.is_some() {
                "set"
            } else {
                "unset"
            },
            self.retry.max_attempts,
            self.retry.base_delay_ms,
            self.retry.max_delay_ms,
            self.optimizer.max_iterations,
            self.optimizer.tolerance_ratio * 100.0,
            self.event_channel_capacity,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to `default` when unset
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value '{raw}'")),
        Err(_) => Ok(default),
    }
}
