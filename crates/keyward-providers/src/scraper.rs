//! Documentation-page model discovery.

use async_trait::async_trait;
use reqwest::Client;

use keyward_core::AppSettings;

use crate::adapter::{dedup_preserving_order, ModelListScraper};
use crate::error::{AdapterError, AdapterResult};
use crate::http::send_ok;

/// Scraper for contexts with no discovery capability: always finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScraper;

#[async_trait]
impl ModelListScraper for NoScraper {
    async fn scrape(&self, _urls: &[String]) -> AdapterResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Fetches documentation pages and collects model-id-shaped `<code>` spans.
///
/// Only URLs whose host is on the settings allowlist are fetched. No
/// credentials are sent.
pub struct DocsPageScraper {
    client: Client,
    settings: AppSettings,
}

impl DocsPageScraper {
    pub fn new(client: Client, settings: AppSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl ModelListScraper for DocsPageScraper {
    async fn scrape(&self, urls: &[String]) -> AdapterResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut last_err = None;
        let mut fetched = 0usize;

        for url in urls {
            if !self.settings.allows(url) {
                tracing::warn!(%url, "docs URL not on allowlist, skipping");
                continue;
            }
            let page = match send_ok(self.client.get(url), "GET docs page").await {
                Ok(response) => response.text().await.map_err(AdapterError::from),
                Err(e) => Err(e),
            };
            match page {
                Ok(html) => {
                    fetched += 1;
                    ids.extend(extract_model_ids(&html));
                }
                Err(e) => {
                    tracing::warn!(%url, "docs fetch failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        match (fetched, last_err) {
            (0, Some(e)) => Err(e),
            _ => Ok(dedup_preserving_order(ids)),
        }
    }
}

/// Contents of `<code>` spans that look like model identifiers.
pub fn extract_model_ids(html: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find("<code") {
        rest = &rest[start..];
        let Some(open_end) = rest.find('>') else { break };
        rest = &rest[open_end + 1..];
        let Some(close) = rest.find("</code>") else { break };
        let candidate = rest[..close].trim();
        if looks_like_model_id(candidate) {
            out.push(candidate.to_string());
        }
        rest = &rest[close + "</code>".len()..];
    }
    out
}

fn looks_like_model_id(s: &str) -> bool {
    (2..=64).contains(&s.len())
        && s.starts_with(|c: char| c.is_ascii_lowercase())
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}
