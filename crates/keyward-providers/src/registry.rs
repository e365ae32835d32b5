use std::collections::BTreeMap;
use std::sync::Arc;

use keyward_core::config::{HttpConfig, ProvidersConfig};
use keyward_core::Provider;

use crate::adapter::{ModelListScraper, ProviderAdapter};
use crate::error::AdapterResult;
use crate::gemini::GeminiAdapter;
use crate::http::build_client;
use crate::openai::OpenAiStyleAdapter;
use crate::perplexity::PerplexityAdapter;

/// Closed mapping from provider to its adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: BTreeMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard adapter set over one shared HTTP client.
    ///
    /// The OpenAI-compatible adapter is only registered when its base URL
    /// is configured.
    pub fn from_config(
        providers: &ProvidersConfig,
        http: &HttpConfig,
        scraper: Arc<dyn ModelListScraper>,
    ) -> AdapterResult<Self> {
        let client = build_client(http)?;
        let mut registry = Self::new();

        registry.register(Arc::new(OpenAiStyleAdapter::venice(
            &providers.venice_base_url,
            client.clone(),
        )));
        registry.register(Arc::new(OpenAiStyleAdapter::xai(
            &providers.xai_base_url,
            client.clone(),
        )));
        registry.register(Arc::new(PerplexityAdapter::new(
            &providers.perplexity_base_url,
            providers.perplexity_docs_urls.clone(),
            scraper,
            client.clone(),
        )));
        registry.register(Arc::new(GeminiAdapter::new(
            &providers.gemini_base_url,
            client.clone(),
        )));

        let compat = providers.openai_compatible_base_url.trim();
        if !compat.is_empty() {
            registry.register(Arc::new(OpenAiStyleAdapter::openai_compatible(compat, client)));
        }

        tracing::debug!(
            providers = ?registry.providers().collect::<Vec<_>>(),
            "provider registry ready"
        );
        Ok(registry)
    }

    /// Add or replace the adapter for its provider.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.adapters.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::NoScraper;

    #[tokio::test]
    async fn openai_compatible_needs_base_url() {
        let providers = ProvidersConfig::default();
        let registry =
            ProviderRegistry::from_config(&providers, &HttpConfig::default(), Arc::new(NoScraper))
                .unwrap();
        assert!(registry.get(Provider::OpenAiCompatible).is_none());
        assert!(registry.get(Provider::VeniceAi).is_some());
        assert!(registry.get(Provider::Gemini).is_some());
        assert_eq!(registry.providers().count(), 4);

        let providers = ProvidersConfig {
            openai_compatible_base_url: "http://localhost:11434/v1".into(),
            ..ProvidersConfig::default()
        };
        let registry =
            ProviderRegistry::from_config(&providers, &HttpConfig::default(), Arc::new(NoScraper))
                .unwrap();
        let adapter = registry.get(Provider::OpenAiCompatible).unwrap();
        assert_eq!(adapter.provider(), Provider::OpenAiCompatible);
    }
}
