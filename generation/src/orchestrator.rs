//! Generation orchestration.
//!
//! For one profile: create the images directory, serve the cached artifact
//! when present, otherwise take a rate limit permit, call the provider under
//! the retry policy and cache the result. Batches run profiles concurrently
//! up to `max_concurrency` and optionally snapshot the images directory once
//! every profile has finished.

use crate::cache::ImageCache;
use crate::prompt::build_prompt;
use crate::provider::{GenerationRequest, ImageSize, ProviderClient, create_provider};
use crate::rate_limiter::RateLimiter;
use crate::report::{ArtifactSource, BackupOutcome, BatchReport, GeneratedImage, ProfileOutcome};
use crate::retry::RetryPolicy;
use crate::telemetry::GenerationTelemetry;
use config::{Config, RateLimitMode};
use errors::{PortraitError, PortraitResult};
use portrait_backup::BackupManager;
use portrait_core::ProfileIdentity;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub model: String,
    pub image_size: ImageSize,
    /// When disabled every call regenerates; artifacts are still written.
    pub cache_enabled: bool,
    pub rate_limit_mode: RateLimitMode,
    pub max_concurrency: usize,
    pub auto_backup: bool
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            image_size: ImageSize::default(),
            cache_enabled: true,
            rate_limit_mode: RateLimitMode::Wait,
            max_concurrency: 4,
            auto_backup: true
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> PortraitResult<Self> {
        Ok(Self {
            model: config.provider.model.clone(),
            image_size: ImageSize::from_config(&config.provider)?,
            cache_enabled: config.cache.enabled,
            rate_limit_mode: config.rate_limit.mode,
            max_concurrency: config.generation.max_concurrency,
            auto_backup: config.backup.auto_backup
        })
    }
}

/// Cheap to clone; clones share the provider, limiter and cancellation token.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    provider: Arc<dyn ProviderClient>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    cache: ImageCache,
    backup: Option<Arc<BackupManager>>,
    settings: Arc<OrchestratorSettings>,
    telemetry: GenerationTelemetry,
    cancel: CancellationToken
}

impl GenerationOrchestrator {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        settings: OrchestratorSettings
    ) -> Self {
        Self {
            provider,
            limiter,
            retry,
            cache: ImageCache::new(),
            backup: None,
            settings: Arc::new(settings),
            telemetry: GenerationTelemetry::new(),
            cancel: CancellationToken::new()
        }
    }

    /// Assemble an orchestrator from validated configuration.
    ///
    /// Must be called inside a Tokio runtime: the rate limiter's refill timer
    /// is spawned here.
    pub fn from_config(config: &Config) -> PortraitResult<Self> {
        let provider = create_provider(&config.provider)?;
        let limiter = RateLimiter::start(
            config.rate_limit.requests_per_minute,
            config.rate_limit.burst_capacity
        )?;
        let orchestrator = Self::new(
            provider,
            limiter,
            RetryPolicy::from_config(&config.retry),
            OrchestratorSettings::from_config(config)?
        );

        Ok(if config.backup.auto_backup {
            orchestrator.with_backup(BackupManager::new(&config.backup))
        } else {
            orchestrator
        })
    }

    pub fn with_backup(mut self, manager: BackupManager) -> Self {
        self.backup = Some(Arc::new(manager));
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Stop waiting for permits and backoff sleeps. In-flight provider calls
    /// run to completion; no new ones start.
    pub fn cancel(&self) {
        info!("Generation cancelled");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bytes of the profile's portrait, generated on a cache miss.
    pub async fn generate_for_profile(&self, identity: &ProfileIdentity, images_dir: &Path) -> PortraitResult<Vec<u8>> {
        self.generate_image(identity, images_dir)
            .await
            .map(|image| image.bytes)
    }

    /// Like [`generate_for_profile`](Self::generate_for_profile), also
    /// reporting whether the provider was called.
    pub async fn generate_image(
        &self,
        identity: &ProfileIdentity,
        images_dir: &Path
    ) -> PortraitResult<GeneratedImage> {
        let span = info_span!("generate_for_profile", profile_id = %identity.id);
        let started = Instant::now();

        let result = self.resolve(identity, images_dir).instrument(span).await;

        let outcome = match &result {
            Ok(image) => image.source.as_str(),
            Err(error) => error.kind()
        };
        self.telemetry.record_generation(outcome, started.elapsed());
        result
    }

    /// Drop the cached artifact and generate a fresh one.
    pub async fn invalidate_and_regenerate(
        &self,
        identity: &ProfileIdentity,
        images_dir: &Path
    ) -> PortraitResult<Vec<u8>> {
        let removed = self.cache.invalidate(identity, images_dir).await?;
        info!(profile_id = %identity.id, removed, "Regenerating portrait");
        self.generate_for_profile(identity, images_dir).await
    }

    /// Generate every profile, at most `max_concurrency` at a time.
    ///
    /// Failures are recorded per profile and never abort the batch. Outcomes
    /// keep the input order.
    pub async fn generate_for_all(&self, profiles: &[ProfileIdentity], images_dir: &Path) -> BatchReport {
        let span = info_span!("generate_for_all", profiles = profiles.len());
        self.run_batch(profiles, images_dir).instrument(span).await
    }

    async fn resolve(&self, identity: &ProfileIdentity, images_dir: &Path) -> PortraitResult<GeneratedImage> {
        tokio::fs::create_dir_all(images_dir)
            .await
            .map_err(|e| PortraitError::file_op("create_dir", images_dir, e))?;

        if self.settings.cache_enabled {
            if let Some(bytes) = self.cached(identity, images_dir).await {
                debug!(profile_id = %identity.id, bytes = bytes.len(), "Serving cached portrait");
                return Ok(GeneratedImage {
                    bytes,
                    source: ArtifactSource::Cache
                });
            }
        }

        self.acquire_permit().await?;
        let bytes = self.call_provider(identity).await?;
        self.cache.put(identity, &bytes, images_dir).await?;

        info!(profile_id = %identity.id, bytes = bytes.len(), "Portrait generated");
        Ok(GeneratedImage {
            bytes,
            source: ArtifactSource::Provider
        })
    }

    async fn cached(&self, identity: &ProfileIdentity, images_dir: &Path) -> Option<Vec<u8>> {
        if !self.cache.exists(identity, images_dir).await {
            self.telemetry.record_cache_lookup("miss");
            return None;
        }

        match self.cache.get(identity, images_dir).await {
            Ok(Some(bytes)) if !bytes.is_empty() => {
                self.telemetry.record_cache_lookup("hit");
                Some(bytes)
            }
            Ok(_) => {
                warn!(profile_id = %identity.id, "Cached portrait vanished or is empty, regenerating");
                self.telemetry.record_cache_lookup("stale");
                None
            }
            Err(e) => {
                warn!(profile_id = %identity.id, error = %e, "Cached portrait unreadable, regenerating");
                self.telemetry.record_cache_lookup("stale");
                None
            }
        }
    }

    /// One permit per generation, taken before the first provider attempt.
    async fn acquire_permit(&self) -> PortraitResult<()> {
        match self.settings.rate_limit_mode {
            RateLimitMode::Wait => {
                let started = Instant::now();
                self.limiter.acquire_cancellable(&self.cancel).await?;
                let waited = started.elapsed();
                self.telemetry.record_rate_limit_wait(waited);
                if !waited.is_zero() {
                    debug!(waited_ms = waited.as_millis() as u64, "Rate limit permit acquired");
                }
                Ok(())
            }
            RateLimitMode::Reject => {
                if self.limiter.try_acquire() {
                    return Ok(());
                }
                self.telemetry.record_rate_limit_rejection();
                let limit = self.limiter.requests_per_minute();
                warn!(limit, "Client-side rate limit exceeded");
                Err(PortraitError::RateLimitExceeded { limit })
            }
        }
    }

    async fn call_provider(&self, identity: &ProfileIdentity) -> PortraitResult<Vec<u8>> {
        let provider_name = self.provider.name();
        let telemetry = self.telemetry;

        self.retry
            .execute_observed(
                &self.cancel,
                |attempt| {
                    let provider = Arc::clone(&self.provider);
                    let request = GenerationRequest::new(
                        build_prompt(identity),
                        self.settings.model.clone(),
                        self.settings.image_size
                    );
                    telemetry.record_provider_attempt(provider_name);
                    debug!(
                        profile_id = %identity.id,
                        provider = provider_name,
                        attempt,
                        "Calling provider"
                    );
                    async move { provider.generate(&request).await }
                },
                |_, error, _| telemetry.record_provider_retry(provider_name, error.kind())
            )
            .await
    }

    async fn run_batch(&self, profiles: &[ProfileIdentity], images_dir: &Path) -> BatchReport {
        let mut report = BatchReport::new();
        let max_concurrency = self.settings.max_concurrency.max(1);
        info!(profiles = profiles.len(), max_concurrency, "Starting batch generation");

        if let Err(e) = tokio::fs::create_dir_all(images_dir).await {
            warn!(dir = %images_dir.display(), error = %e, "Could not create images directory");
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, identity) in profiles.iter().enumerate() {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let identity = identity.clone();
            let images_dir = images_dir.to_path_buf();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => this.generate_image(&identity, &images_dir).await,
                    Err(e) => Err(PortraitError::TaskFailed {
                        reason: e.to_string()
                    })
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<GeneratedImage, PortraitError>>> =
            std::iter::repeat_with(|| None).take(profiles.len()).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "Generation task aborted")
            }
        }

        report.outcomes = profiles
            .iter()
            .zip(slots)
            .map(|(identity, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(PortraitError::TaskFailed {
                        reason: "generation task panicked".to_string()
                    })
                });
                if let Err(e) = &result {
                    warn!(profile_id = %identity.id, error = %e, "Profile generation failed");
                }
                let outcome = ProfileOutcome {
                    profile_id: identity.id.clone(),
                    result
                };
                self.telemetry.record_batch_profile(outcome.status());
                outcome
            })
            .collect();

        report.backup = self.backup_after_batch(images_dir).await;
        report.complete();

        info!(
            total = report.total(),
            generated = report.generated(),
            cached = report.cached(),
            failed = report.failed(),
            "Batch generation finished"
        );
        report
    }

    async fn backup_after_batch(&self, images_dir: &Path) -> Option<BackupOutcome> {
        if !self.settings.auto_backup {
            return None;
        }
        let manager = Arc::clone(self.backup.as_ref()?);
        let source = images_dir.to_path_buf();

        let outcome = match tokio::task::spawn_blocking(move || manager.create_backup(&source)).await {
            Ok(Ok(backup)) => {
                self.telemetry.record_backup("success");
                BackupOutcome::Created {
                    snapshot: backup.snapshot,
                    files: backup.files_backed_up
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Automatic backup failed");
                self.telemetry.record_backup("failure");
                BackupOutcome::Failed { reason: e.to_string() }
            }
            Err(e) => {
                warn!(error = %e, "Automatic backup task aborted");
                self.telemetry.record_backup("failure");
                BackupOutcome::Failed { reason: e.to_string() }
            }
        };
        Some(outcome)
    }
}
