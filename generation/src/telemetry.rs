use metrics::{counter, histogram};
use std::time::Duration;

/// Counters and histograms emitted by the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationTelemetry;

impl GenerationTelemetry {
    pub fn new() -> Self {
        Self
    }

    /// `outcome` is `generated`, `cached` or an error kind.
    pub fn record_generation(&self, outcome: &str, duration: Duration) {
        counter!("portrait_generation_requests_total", "outcome" => outcome.to_string()).increment(1);
        histogram!("portrait_generation_duration_seconds", "outcome" => outcome.to_string())
            .record(duration.as_secs_f64());
    }

    /// `result` is `hit`, `miss` or `stale`.
    pub fn record_cache_lookup(&self, result: &'static str) {
        counter!("portrait_cache_lookups_total", "result" => result).increment(1);
    }

    pub fn record_provider_attempt(&self, provider: &'static str) {
        counter!("portrait_provider_attempts_total", "provider" => provider).increment(1);
    }

    pub fn record_provider_retry(&self, provider: &'static str, error: &'static str) {
        let labels = [("provider", provider.to_string()), ("error", error.to_string())];
        counter!("portrait_provider_retries_total", &labels).increment(1);
    }

    pub fn record_rate_limit_wait(&self, waited: Duration) {
        histogram!("portrait_rate_limit_wait_seconds").record(waited.as_secs_f64());
    }

    pub fn record_rate_limit_rejection(&self) {
        counter!("portrait_rate_limit_rejections_total").increment(1);
    }

    /// `status` is `generated`, `cached` or `failed`.
    pub fn record_batch_profile(&self, status: &'static str) {
        counter!("portrait_batch_profiles_total", "status" => status).increment(1);
    }

    /// `status` is `success` or `failure`.
    pub fn record_backup(&self, status: &'static str) {
        counter!("portrait_backups_total", "status" => status).increment(1);
    }
}
