use anyhow::Result;
use serde::Deserialize;
use std::str::FromStr;

use crate::types::TimeRange;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub api: Api,
    pub dashboard: Dashboard,
    pub web: Web,
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Api {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Dashboard {
    pub default_range: String,
    pub top_wallets_limit: u32,
    pub wallet_page_size: u32,
}

impl Dashboard {
    /// Configured default range, falling back to 30d if the string is not
    /// one of 7d/30d/90d.
    pub fn range(&self) -> TimeRange {
        TimeRange::parse(&self.default_range).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Web {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
