use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header;
use std::time::Duration;
use url::Url;

/// Source of page content for the crawler.
pub trait Fetcher: Send + Sync {
    /// HTML content of `url`, or `None` if it cannot be fetched.
    fn fetch(&self, url: &Url) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_redirects: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_redirects: 3,
            timeout: Duration::from_secs(12),
            user_agent: "search-engine-rs-bot/0.1".to_string(),
        }
    }
}

/// Blocking HTTP fetcher that only accepts successful `text/html` responses.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Option<String> {
        let resp = match self.client.get(url.clone()).send() {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(%url, %err, "fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!(%url, status = %resp.status(), "fetch rejected");
            return None;
        }
        let is_html = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
        if !is_html {
            return None;
        }
        resp.text().ok()
    }
}
