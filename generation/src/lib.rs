//! # Portrait Generation
//!
//! Orchestrates AI portrait generation for profiles:
//!
//! - [`RateLimiter`]: client-side token bucket in front of the provider
//! - [`RetryPolicy`]: exponential backoff for transient provider failures
//! - [`ImageCache`]: filesystem-backed artifact cache, one file per profile
//! - [`ProviderClient`]: images API clients (OpenAI and Azure OpenAI)
//! - [`GenerationOrchestrator`]: single-profile and bounded-concurrency
//!   batch generation with an optional backup afterwards
//!
//! Generated images are written to an images directory that also serves as
//! the cache. A profile whose image file exists is never sent to the
//! provider again unless it is explicitly invalidated.

pub mod cache;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod rate_limiter;
pub mod report;
pub mod retry;
pub mod telemetry;

pub use cache::ImageCache;
pub use orchestrator::{GenerationOrchestrator, OrchestratorSettings};
pub use prompt::{build_prompt, personality_trait};
pub use provider::{
    AzureOpenAiClient, GenerationRequest, ImageSize, OpenAiClient, ProviderClient, create_provider
};
pub use rate_limiter::RateLimiter;
pub use report::{ArtifactSource, BackupOutcome, BatchReport, GeneratedImage, ProfileOutcome};
pub use retry::RetryPolicy;
pub use telemetry::GenerationTelemetry;
