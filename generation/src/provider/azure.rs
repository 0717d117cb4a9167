use super::wire::{self, ImagesRequestBody};
use super::{GenerationRequest, ProviderClient, build_http_client, require_api_key};
use async_trait::async_trait;
use config::ProviderConfig;
use errors::PortraitResult;
use reqwest::Client;
use tracing::debug;

/// Azure OpenAI images client.
///
/// The request model names the deployment:
/// `POST {base_url}/openai/deployments/{model}/images/generations?api-version=...`
pub struct AzureOpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_version: String
}

impl AzureOpenAiClient {
    pub fn new(config: &ProviderConfig) -> PortraitResult<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: require_api_key(config)?,
            api_version: config.api_version.clone()
        })
    }

    fn endpoint(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/images/generations?api-version={}",
            self.base_url, deployment, self.api_version
        )
    }
}

#[async_trait]
impl ProviderClient for AzureOpenAiClient {
    fn name(&self) -> &'static str {
        "azure_open_ai"
    }

    async fn generate(&self, request: &GenerationRequest) -> PortraitResult<Vec<u8>> {
        let url = self.endpoint(&request.model);
        debug!(url = %url, size = %request.size, "Requesting image generation");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&ImagesRequestBody::from(request))
            .send()
            .await
            .map_err(wire::transport_error)?;

        wire::read_image_response(response).await
    }
}
