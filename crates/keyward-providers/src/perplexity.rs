//! Perplexity: verification by a one-token chat completion, model
//! discovery through `/v1/models` with a documentation-scrape fallback.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::{json, Value};

use keyward_core::Provider;

use crate::adapter::{dedup_preserving_order, ModelListScraper, ProviderAdapter, Verification};
use crate::error::{AdapterError, AdapterResult};
use crate::http::{bearer, endpoint, json_body};

/// Cheapest model, used for the one-token verification request.
pub const VERIFY_MODEL: &str = "sonar";

pub struct PerplexityAdapter {
    base_url: String,
    docs_urls: Vec<String>,
    scraper: Arc<dyn ModelListScraper>,
    client: Client,
}

impl PerplexityAdapter {
    pub fn new(
        base_url: impl Into<String>,
        docs_urls: Vec<String>,
        scraper: Arc<dyn ModelListScraper>,
        client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            docs_urls,
            scraper,
            client,
        }
    }

    /// `Ok(None)` when the endpoint is absent (404); the caller falls back.
    async fn list_via_api(&self, key: &SecretString) -> AdapterResult<Option<Vec<String>>> {
        let request = bearer(self.client.get(endpoint(&self.base_url, "v1/models")), key)?;
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AdapterError::http_status(
                status.as_u16(),
                format!("GET /v1/models responded with {status}"),
            ));
        }

        let body = json_body(response, "GET /v1/models").await?;
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AdapterError::UnexpectedResponseShape("GET /v1/models: missing `data` array".into())
            })?;
        let ids = items.iter().filter_map(|m| m.get("id").and_then(Value::as_str));
        Ok(Some(dedup_preserving_order(ids)))
    }
}

#[async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn provider(&self) -> Provider {
        Provider::Perplexity
    }

    async fn verify(&self, key: &SecretString) -> AdapterResult<Verification> {
        let body = json!({
            "model": VERIFY_MODEL,
            "messages": [{ "role": "user", "content": "ping" }],
            "max_tokens": 1,
        });
        let request = bearer(
            self.client
                .post(endpoint(&self.base_url, "chat/completions"))
                .json(&body),
            key,
        )?;
        let response = request.send().await?;
        let verification = Verification::from_status(response.status(), "POST /chat/completions")?;
        tracing::debug!(provider = %Provider::Perplexity, status = verification.status, "verify");
        Ok(verification)
    }

    async fn list_models(&self, key: &SecretString) -> AdapterResult<Vec<String>> {
        match self.list_via_api(key).await {
            Ok(Some(ids)) if !ids.is_empty() => return Ok(ids),
            Ok(Some(_)) => tracing::info!("perplexity /v1/models returned no models, scraping docs"),
            Ok(None) => tracing::info!("perplexity /v1/models not available, scraping docs"),
            Err(e) => tracing::warn!("perplexity /v1/models failed, scraping docs: {e}"),
        }

        let ids = self.scraper.scrape(&self.docs_urls).await?;
        Ok(dedup_preserving_order(ids))
    }
}
