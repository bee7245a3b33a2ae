//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The eBay user token is referenced by env-var name in the config and
//! resolved once at startup into a [`SecretString`].

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::executor::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://api.ebay.com/buy/browse/v1";
const DEFAULT_TOKEN_ENV: &str = "EBAY_USER_TOKEN";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub ebay: EbayConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EbayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the OAuth user token.
    #[serde(default = "default_token_env")]
    pub user_token_env: String,
    /// Sent as `X-EBAY-C-MARKETPLACE-ID` when set (e.g. "EBAY_US").
    #[serde(default)]
    pub marketplace_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub cert_id: Option<String>,
    #[serde(default)]
    pub dev_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts per remote call, including the first.
    pub max_retries: u32,
    /// Flat pause between attempts.
    pub retry_delay_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry.max_retries == 0 {
            anyhow::bail!("retry.max_retries must be at least 1");
        }
        if self.ebay.base_url.trim().is_empty() {
            anyhow::bail!("ebay.base_url must not be empty");
        }
        Ok(())
    }

    /// The retry policy shared by every outbound call.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            retry_delay: Duration::from_secs(self.retry.retry_delay_secs),
        }
    }

    /// Resolve the configured user token from the environment.
    pub fn user_token(&self) -> Result<SecretString> {
        let token = Self::resolve_env(&self.ebay.user_token_env)?;
        if token.trim().is_empty() {
            anyhow::bail!("Environment variable {} is empty", self.ebay.user_token_env);
        }
        Ok(SecretString::new(token))
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
