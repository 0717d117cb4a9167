use crate::fixtures::{b64_image_response, error_response};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const IMAGES_PATH: &str = "/images/generations";

/// Mock images API listening on a random local port.
pub struct MockImagesApi {
    server: MockServer
}

impl MockImagesApi {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        tracing::debug!(uri = %server.uri(), "Mock images API started");
        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Every request succeeds with `bytes`.
    pub async fn mount_image(&self, bytes: &[u8]) {
        Mock::given(method("POST"))
            .and(path(IMAGES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(b64_image_response(bytes)))
            .mount(&self.server)
            .await;
    }

    /// The first `times` requests fail with `status`, taking priority over
    /// mocks mounted with the default priority.
    pub async fn mount_failures(&self, status: u16, times: u64) {
        Mock::given(method("POST"))
            .and(path(IMAGES_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_response("upstream failure")))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Every request fails with `status`.
    pub async fn mount_status(&self, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(IMAGES_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_response(message)))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
