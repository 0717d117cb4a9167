//! Images API clients.

mod azure;
mod openai;
mod request;
mod wire;

pub use azure::AzureOpenAiClient;
pub use openai::OpenAiClient;
pub use request::{GenerationRequest, ImageSize};

use async_trait::async_trait;
use config::{ProviderConfig, ProviderKind};
use errors::{PortraitError, PortraitResult};
use reqwest::Client;
use std::sync::Arc;

/// A remote image generation service.
///
/// Implementations perform exactly one upstream call per invocation and
/// classify failures; retrying is left to the caller.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Generate one image and return its decoded bytes.
    async fn generate(&self, request: &GenerationRequest) -> PortraitResult<Vec<u8>>;
}

pub fn create_provider(config: &ProviderConfig) -> PortraitResult<Arc<dyn ProviderClient>> {
    let provider: Arc<dyn ProviderClient> = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(config)?),
        ProviderKind::AzureOpenAi => Arc::new(AzureOpenAiClient::new(config)?)
    };
    tracing::info!(provider = provider.name(), base_url = %config.base_url, "Provider client created");
    Ok(provider)
}

pub(crate) fn build_http_client(config: &ProviderConfig) -> PortraitResult<Client> {
    Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| PortraitError::configuration(format!("Failed to build HTTP client: {e}")))
}

pub(crate) fn require_api_key(config: &ProviderConfig) -> PortraitResult<String> {
    let key = config.api_key.trim();
    if key.is_empty() {
        return Err(PortraitError::configuration(format!(
            "No API key configured for provider {}",
            config.kind
        )));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ProviderKind, api_key: &str) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: api_key.to_string(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_factory_selects_client_by_kind() {
        let openai = create_provider(&config(ProviderKind::OpenAi, "sk-test")).unwrap();
        assert_eq!(openai.name(), "open_ai");

        let azure = create_provider(&config(ProviderKind::AzureOpenAi, "azure-key")).unwrap();
        assert_eq!(azure.name(), "azure_open_ai");
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let result = create_provider(&config(ProviderKind::OpenAi, "  "));
        assert!(matches!(result, Err(PortraitError::Configuration { .. })));
    }
}
