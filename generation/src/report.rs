//! Results of single and batch generation.

use chrono::{DateTime, Utc};
use errors::PortraitError;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Served from the images directory without a provider call.
    Cache,
    /// Freshly generated by the provider.
    Provider
}

impl ArtifactSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactSource::Cache => "cached",
            ArtifactSource::Provider => "generated"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub source: ArtifactSource
}

#[derive(Debug)]
pub struct ProfileOutcome {
    pub profile_id: String,
    pub result: Result<GeneratedImage, PortraitError>
}

impl ProfileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// `generated`, `cached` or `failed`.
    pub fn status(&self) -> &'static str {
        match &self.result {
            Ok(image) => image.source.as_str(),
            Err(_) => "failed"
        }
    }
}

#[derive(Debug, Clone)]
pub enum BackupOutcome {
    Created { snapshot: PathBuf, files: usize },
    Failed { reason: String }
}

/// Per-profile results of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ProfileOutcome>,
    pub backup: Option<BackupOutcome>
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            outcomes: Vec::new(),
            backup: None
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn generated(&self) -> usize {
        self.count_status("generated")
    }

    pub fn cached(&self) -> usize {
        self.count_status("cached")
    }

    pub fn failed(&self) -> usize {
        self.count_status("failed")
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ProfileOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PortraitError)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .result
                .as_ref()
                .err()
                .map(|error| (outcome.profile_id.as_str(), error))
        })
    }

    fn count_status(&self, status: &str) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.status() == status).count()
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
