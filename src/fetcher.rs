use crate::config::ScrapingConfig;
use crate::constants;
use crate::error::{Result, ScraperError};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// A fetched page plus the digest used for change detection.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub html: String,
    pub digest: String,
}

impl RawPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        let html = html.into();
        let digest = page_digest(&html);
        Self { url, html, digest }
    }
}

/// SHA-256 hex digest of a page body.
pub fn page_digest(html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    hex::encode(hasher.finalize())
}

/// HTTP retrieval with error normalization. No retries happen here; callers
/// decide whether a failed fetch is retried or degraded.
pub struct Fetcher {
    client: reqwest::Client,
    proxy_api_key: Option<String>,
    proxy_timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &ScrapingConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            proxy_api_key: config.proxy_api_key.clone(),
            proxy_timeout: Duration::from_secs(config.proxy_timeout_seconds),
        }
    }

    /// Fetch a page directly.
    pub async fn fetch(&self, url: &str) -> Result<RawPage> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch { status: status.as_u16(), url: url.to_string() });
        }

        let html = response.text().await?;
        if html.trim().is_empty() {
            return Err(ScraperError::EmptyResponse);
        }

        Ok(RawPage::new(url, html))
    }

    /// Fetch through the rendering proxy when a key is configured, falling
    /// back to a direct fetch otherwise. Pages behind script execution only
    /// yield their match links through the proxy.
    pub async fn fetch_rendered(&self, url: &str) -> Result<RawPage> {
        let Some(key) = self.proxy_api_key.as_deref() else {
            return self.fetch(url).await;
        };

        let api_url = format!(
            "https://api.scraperapi.com/?api_key={}&url={}&render=true",
            key,
            urlencoding::encode(url)
        );
        debug!("Fetching {} via rendering proxy", url);

        let response = self
            .client
            .get(&api_url)
            .timeout(self.proxy_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Rendering proxy returned status {} for {}", status.as_u16(), url);
            return Err(ScraperError::Fetch { status: status.as_u16(), url: url.to_string() });
        }

        let html = response.text().await?;
        if html.trim().is_empty() {
            return Err(ScraperError::EmptyResponse);
        }

        Ok(RawPage::new(url, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        let a = page_digest("<html></html>");
        let b = page_digest("<html></html>");
        assert_eq!(a, b);
        assert_ne!(a, page_digest("<html> </html>"));
    }
}
