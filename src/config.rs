//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Credentials are referenced by env-var name in the config and resolved at
//! runtime, so the file itself never holds secrets.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::storage::DEFAULT_OUTPUT_FILE;
use crate::types::{Credentials, DEFAULT_SPEED_MODE};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_customer_id_env")]
    pub customer_id_env: String,
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    /// Speed preset index, 0 (safest) to 4 (fastest).
    #[serde(default = "default_speed_mode")]
    pub speed_mode: usize,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_customer_id_env() -> String {
    "SEARCHAD_CUSTOMER_ID".to_string()
}

fn default_access_key_env() -> String {
    "SEARCHAD_ACCESS_KEY".to_string()
}

fn default_secret_key_env() -> String {
    "SEARCHAD_SECRET_KEY".to_string()
}

fn default_speed_mode() -> usize {
    DEFAULT_SPEED_MODE
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            customer_id_env: default_customer_id_env(),
            access_key_env: default_access_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            speed_mode: default_speed_mode(),
            output_path: default_output_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Read the three credentials from the environment and validate them.
    pub fn credentials(&self) -> Result<Credentials> {
        let customer_id = Self::resolve_env(&self.api.customer_id_env)?;
        let access_key = Self::resolve_env(&self.api.access_key_env)?;
        let secret_key = Self::resolve_env(&self.api.secret_key_env)?;
        Ok(Credentials::new(customer_id, access_key, secret_key)?)
    }
}
