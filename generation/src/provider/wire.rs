//! Images API wire format shared by the HTTP clients.

use super::GenerationRequest;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use errors::{PortraitError, PortraitResult};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;

const MAX_ERROR_MESSAGE_CHARS: usize = 512;

#[derive(Debug, Serialize)]
pub(crate) struct ImagesRequestBody<'a> {
    prompt: &'a str,
    n: u8,
    size: String,
    response_format: &'static str,
    model: &'a str
}

impl<'a> From<&'a GenerationRequest> for ImagesRequestBody<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            prompt: &request.prompt,
            n: GenerationRequest::IMAGE_COUNT,
            size: request.size.to_string(),
            response_format: GenerationRequest::RESPONSE_FORMAT,
            model: &request.model
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String
}

/// Transport failures (timeouts, refused connections, broken bodies) are
/// transient.
pub(crate) fn transport_error(err: reqwest::Error) -> PortraitError {
    let reason = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };

    PortraitError::ApiConnection {
        status: err.status().map(|status| status.as_u16()),
        reason
    }
}

pub(crate) async fn read_image_response(response: Response) -> PortraitResult<Vec<u8>> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await.map_err(transport_error)?;
        return decode_image_payload(&body);
    }

    let retry_after = retry_after_secs(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, retry_after, &body))
}

pub(crate) fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> PortraitError {
    let message = error_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortraitError::ApiAuthentication {
            status: status.as_u16(),
            message
        },
        StatusCode::TOO_MANY_REQUESTS => PortraitError::ApiRateLimit { retry_after_secs },
        status if status.is_server_error() => PortraitError::ApiConnection {
            status: Some(status.as_u16()),
            reason: message
        },
        status => PortraitError::ApiRejected {
            status: status.as_u16(),
            message
        }
    }
}

/// Decode the first image of a success body.
///
/// Truncated or syntactically broken JSON is treated as a transient transport
/// problem; well-formed bodies without usable image data are permanent.
pub(crate) fn decode_image_payload(body: &[u8]) -> PortraitResult<Vec<u8>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PortraitError::invalid_response("empty response body"));
    }

    let parsed: ImagesResponse = serde_json::from_slice(body).map_err(|e| match e.classify() {
        Category::Syntax | Category::Eof | Category::Io => PortraitError::ApiConnection {
            status: None,
            reason: format!("malformed response body: {e}")
        },
        Category::Data => PortraitError::invalid_response(format!("unexpected response shape: {e}"))
    })?;

    let encoded = parsed
        .data
        .into_iter()
        .next()
        .and_then(|datum| datum.b64_json)
        .filter(|encoded| !encoded.trim().is_empty())
        .ok_or_else(|| PortraitError::invalid_response("response contained no image data"))?;

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| PortraitError::invalid_response(format!("image payload is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Err(PortraitError::invalid_response("decoded image is empty"));
    }
    Ok(bytes)
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.canonical_reason().unwrap_or("unknown error").to_string();
    }
    trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ImageSize;
    use serde_json::json;

    #[test]
    fn test_request_body_matches_wire_contract() {
        let request = GenerationRequest::new("portrait", "dall-e-3", ImageSize::new(1024, 1792));
        let body = serde_json::to_value(ImagesRequestBody::from(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "prompt": "portrait",
                "n": 1,
                "size": "1024x1792",
                "response_format": "b64_json",
                "model": "dall-e-3"
            })
        );
    }

    #[test]
    fn test_decode_success_body() {
        let body = json!({ "data": [{ "b64_json": STANDARD.encode(b"png") }] }).to_string();
        assert_eq!(decode_image_payload(body.as_bytes()).unwrap(), b"png");
    }

    #[test]
    fn test_decode_rejects_missing_image_data() {
        for body in [
            json!({}).to_string(),
            json!({ "data": [] }).to_string(),
            json!({ "data": [{ "b64_json": "" }] }).to_string(),
            json!({ "data": [{ "url": "https://example.com/a.png" }] }).to_string(),
            json!({ "data": [{ "b64_json": "not base64!" }] }).to_string(),
            json!({ "data": "oops" }).to_string(),
            String::new()
        ] {
            let err = decode_image_payload(body.as_bytes()).unwrap_err();
            assert!(
                matches!(err, PortraitError::InvalidResponse { .. }),
                "{body} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_truncated_body_is_transient() {
        let err = decode_image_payload(br#"{"data": [{"b64_json": "aGVs"#).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, ""),
            PortraitError::ApiAuthentication { status: 401, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, None, ""),
            PortraitError::ApiAuthentication { status: 403, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(3), ""),
            PortraitError::ApiRateLimit { retry_after_secs: Some(3) }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None, ""),
            PortraitError::ApiConnection { status: Some(502), .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, ""),
            PortraitError::ApiRejected { status: 400, .. }
        ));
    }

    #[test]
    fn test_error_message_prefers_provider_message() {
        let body = json!({ "error": { "message": "Your prompt was rejected", "type": "invalid_request_error" } });
        match status_error(StatusCode::BAD_REQUEST, None, &body.to_string()) {
            PortraitError::ApiRejected { message, .. } => assert_eq!(message, "Your prompt was rejected"),
            other => panic!("unexpected error: {other:?}")
        }

        match status_error(StatusCode::INTERNAL_SERVER_ERROR, None, "") {
            PortraitError::ApiConnection { reason, .. } => assert_eq!(reason, "Internal Server Error"),
            other => panic!("unexpected error: {other:?}")
        }
    }
}
