use super::wire::{self, ImagesRequestBody};
use super::{GenerationRequest, ProviderClient, build_http_client, require_api_key};
use async_trait::async_trait;
use config::ProviderConfig;
use errors::PortraitResult;
use reqwest::Client;
use tracing::debug;

/// OpenAI images API client (`POST {base_url}/images/generations`).
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String
}

impl OpenAiClient {
    pub fn new(config: &ProviderConfig) -> PortraitResult<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: require_api_key(config)?
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url)
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "open_ai"
    }

    async fn generate(&self, request: &GenerationRequest) -> PortraitResult<Vec<u8>> {
        let url = self.endpoint();
        debug!(url = %url, model = %request.model, size = %request.size, "Requesting image generation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ImagesRequestBody::from(request))
            .send()
            .await
            .map_err(wire::transport_error)?;

        wire::read_image_response(response).await
    }
}
