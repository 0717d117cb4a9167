//! Shared test fixtures for the portrait workspace.
//!
//! Provides:
//! - Profile identities with realistic attributes
//! - Deterministic image payloads and provider response bodies
//! - A wiremock-backed stand-in for the images generation API

mod fixtures;
mod images_api;

pub use fixtures::*;
pub use images_api::{IMAGES_PATH, MockImagesApi};
