//! Adapters for providers exposing an OpenAI-style `GET /models` listing
//! behind bearer auth: Venice.ai, xAI and any OpenAI-compatible endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::Value;

use keyward_core::Provider;

use crate::adapter::{dedup_preserving_order, ProviderAdapter, Verification};
use crate::error::{AdapterError, AdapterResult};
use crate::http::{bearer, endpoint, json_body, send_ok};

/// How to read the `/models` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    /// `{ "data": [ { "id": ... } ] }`
    OpenAi,
    /// `data` or `models` array; each item's `id`, else its `name`.
    Lenient,
}

pub struct OpenAiStyleAdapter {
    provider: Provider,
    base_url: String,
    shape: ListingShape,
    client: Client,
}

impl OpenAiStyleAdapter {
    pub fn new(
        provider: Provider,
        base_url: impl Into<String>,
        shape: ListingShape,
        client: Client,
    ) -> Self {
        Self {
            provider,
            base_url: base_url.into(),
            shape,
            client,
        }
    }

    pub fn venice(base_url: impl Into<String>, client: Client) -> Self {
        Self::new(Provider::VeniceAi, base_url, ListingShape::Lenient, client)
    }

    pub fn xai(base_url: impl Into<String>, client: Client) -> Self {
        Self::new(Provider::Xai, base_url, ListingShape::OpenAi, client)
    }

    pub fn openai_compatible(base_url: impl Into<String>, client: Client) -> Self {
        Self::new(Provider::OpenAiCompatible, base_url, ListingShape::OpenAi, client)
    }

    fn models_url(&self) -> String {
        endpoint(&self.base_url, "models")
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiStyleAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn verify(&self, key: &SecretString) -> AdapterResult<Verification> {
        let request = bearer(self.client.get(self.models_url()), key)?;
        let response = request.send().await?;
        let verification = Verification::from_status(response.status(), "GET /models")?;
        tracing::debug!(provider = %self.provider, status = verification.status, "verify");
        Ok(verification)
    }

    async fn list_models(&self, key: &SecretString) -> AdapterResult<Vec<String>> {
        let request = bearer(self.client.get(self.models_url()), key)?;
        let response = send_ok(request, "GET /models").await?;
        let body = json_body(response, "GET /models").await?;
        let ids = parse_listing(&body, self.shape)?;
        tracing::debug!(provider = %self.provider, count = ids.len(), "listed models");
        Ok(ids)
    }
}

fn parse_listing(body: &Value, shape: ListingShape) -> AdapterResult<Vec<String>> {
    let items = match shape {
        ListingShape::OpenAi => body.get("data").and_then(Value::as_array),
        ListingShape::Lenient => body
            .get("data")
            .and_then(Value::as_array)
            .or_else(|| body.get("models").and_then(Value::as_array)),
    }
    .ok_or_else(|| {
        let expected = match shape {
            ListingShape::OpenAi => "`data` array",
            ListingShape::Lenient => "`data` or `models` array",
        };
        AdapterError::UnexpectedResponseShape(format!("GET /models: missing {expected}"))
    })?;

    let ids = items.iter().filter_map(|item| {
        let id = item.get("id").and_then(Value::as_str);
        match shape {
            ListingShape::OpenAi => id,
            ListingShape::Lenient => id.or_else(|| item.get("name").and_then(Value::as_str)),
        }
    });
    Ok(dedup_preserving_order(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_shape_reads_data_ids() {
        let body = json!({ "object": "list", "data": [
            { "id": "grok-4", "object": "model" },
            { "id": "grok-3-mini" },
            { "id": "grok-4" },
            { "object": "model" }
        ]});
        let ids = parse_listing(&body, ListingShape::OpenAi).unwrap();
        assert_eq!(ids, vec!["grok-4", "grok-3-mini"]);
    }

    #[test]
    fn openai_shape_requires_data() {
        let body = json!({ "models": [{ "id": "x" }] });
        assert!(matches!(
            parse_listing(&body, ListingShape::OpenAi),
            Err(AdapterError::UnexpectedResponseShape(_))
        ));
    }

    #[test]
    fn lenient_shape_accepts_models_and_names() {
        let body = json!({ "models": [
            { "name": "llama-3.3-70b" },
            { "id": "venice-uncensored", "name": "Venice Uncensored" },
            { "name": "" }
        ]});
        let ids = parse_listing(&body, ListingShape::Lenient).unwrap();
        assert_eq!(ids, vec!["llama-3.3-70b", "venice-uncensored"]);
    }

    #[test]
    fn empty_listing_is_not_an_error() {
        let ids = parse_listing(&json!({ "data": [] }), ListingShape::OpenAi).unwrap();
        assert!(ids.is_empty());
    }
}
