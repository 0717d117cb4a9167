use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use portrait_core::{Gender, ProfileIdentity};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Bytes standing in for a generated image: a PNG signature followed by `seed`.
pub fn image_bytes(seed: &str) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(seed.as_bytes());
    bytes
}

/// Images API success body carrying `bytes` as base64.
pub fn b64_image_response(bytes: &[u8]) -> Value {
    json!({
        "created": 1_700_000_000,
        "data": [{ "b64_json": STANDARD.encode(bytes) }]
    })
}

/// OpenAI-style error body.
pub fn error_response(message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "invalid_request_error"
        }
    })
}

/// The profile used throughout prompt and orchestration tests.
pub fn maria_lopez() -> ProfileIdentity {
    ProfileIdentity::new("maria-lopez", "Maria", "Lopez")
        .with_age(26)
        .with_ethnicity("Hispanic")
        .with_gender(Gender::Female)
        .with_personality("ENFP")
        .with_bio("Loves hiking and salsa dancing")
}

pub fn identity(id: &str) -> ProfileIdentity {
    ProfileIdentity::new(id, "Test", id.to_uppercase())
        .with_age(30)
        .with_gender(Gender::NonBinary)
}

pub fn identities(prefix: &str, count: usize) -> Vec<ProfileIdentity> {
    (0..count)
        .map(|index| identity(&format!("{prefix}-{index}")))
        .collect()
}

pub fn temp_images_dir() -> TempDir {
    match tempfile::Builder::new().prefix("portraits-").tempdir() {
        Ok(dir) => dir,
        Err(e) => panic!("failed to create temp images dir: {e}")
    }
}
