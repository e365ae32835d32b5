//! Google Gemini: `GET {base}/models` with the `x-goog-api-key` header.
//!
//! The key travels in a header rather than the `?key=` query parameter so
//! it can never end up in a URL carried by an error.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use keyward_core::Provider;

use crate::adapter::{dedup_preserving_order, ProviderAdapter, Verification};
use crate::error::{AdapterError, AdapterResult};
use crate::http::{endpoint, json_body, secret_header, send_ok};

const API_KEY_HEADER: &str = "x-goog-api-key";
const PAGE_SIZE: &str = "1000";
/// Stop following `nextPageToken` after this many pages.
const MAX_PAGES: usize = 10;
/// Verification statuses that reject the key.
const GEMINI_REJECTED: &[u16] = &[400, 401, 403];

pub struct GeminiAdapter {
    base_url: String,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn request(
        &self,
        key: &SecretString,
        page_token: Option<&str>,
    ) -> AdapterResult<reqwest::RequestBuilder> {
        let mut query = vec![("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let request = self
            .client
            .get(endpoint(&self.base_url, "models"))
            .query(&query);
        secret_header(request, API_KEY_HEADER, key.expose_secret())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn verify(&self, key: &SecretString) -> AdapterResult<Verification> {
        let response = self.request(key, None)?.send().await?;
        // An unknown key is 400 API_KEY_INVALID rather than 401
        let verification =
            Verification::classify(response.status(), GEMINI_REJECTED, "GET /models")?;
        tracing::debug!(provider = %Provider::Gemini, status = verification.status, "verify");
        Ok(verification)
    }

    async fn list_models(&self, key: &SecretString) -> AdapterResult<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let request = self.request(key, page_token.as_deref())?;
            let response = send_ok(request, "GET /models").await?;
            let body = json_body(response, "GET /models").await?;
            let (page, next) = parse_page(&body)?;
            names.extend(page);
            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(dedup_preserving_order(names))
    }
}

/// Model names of one page, `models/` prefix stripped, plus the next page token.
fn parse_page(body: &Value) -> AdapterResult<(Vec<String>, Option<String>)> {
    // An account with no models gets `{}` rather than an empty array
    let items = match body.get("models") {
        Some(v) => v.as_array().ok_or_else(|| {
            AdapterError::UnexpectedResponseShape("GET /models: `models` is not an array".into())
        })?,
        None if body.is_object() => return Ok((Vec::new(), None)),
        None => {
            return Err(AdapterError::UnexpectedResponseShape(
                "GET /models: body is not an object".into(),
            ))
        }
    };

    let names = items
        .iter()
        .filter_map(|m| m.get("name").and_then(Value::as_str))
        .map(|name| name.strip_prefix("models/").unwrap_or(name).to_string())
        .collect();
    let next = body
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);
    Ok((names, next))
}
