use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraping: ScrapingConfig,
    pub live_refresh: LiveRefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingConfig {
    /// Pause between outbound requests during batch scrapes.
    pub delay_ms: u64,
    /// Token-bucket cap on outbound requests across all scrape paths.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    pub timeout_seconds: u64,
    /// Rendering proxy requests run scripts on the target page and take longer.
    pub proxy_timeout_seconds: u64,
    /// ScraperAPI key; the SCRAPER_API_KEY env var takes precedence.
    pub proxy_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveRefreshConfig {
    pub interval_seconds: u64,
}

fn default_requests_per_minute() -> u32 {
    60
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", config_path, e))
        })?;

        let mut config: Config = toml::from_str(&config_content)?;
        if let Ok(key) = std::env::var("SCRAPER_API_KEY") {
            if !key.trim().is_empty() {
                config.scraping.proxy_api_key = Some(key);
            }
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraping: ScrapingConfig {
                delay_ms: 500,
                requests_per_minute: 60,
                timeout_seconds: 30,
                proxy_timeout_seconds: 120,
                proxy_api_key: None,
            },
            live_refresh: LiveRefreshConfig { interval_seconds: 90 },
        }
    }
}
