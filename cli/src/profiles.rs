//! Profiles file loading.

use anyhow::{Context, Result, bail};
use portrait_core::{ProfileIdentity, ProfileRecord, ProfileSource, RecordProjection};
use std::path::Path;

/// Identities of a JSON array of profile records, optionally restricted to
/// the ids in `only`.
pub fn load(path: &Path, only: &[String]) -> Result<Vec<ProfileIdentity>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profiles file {}", path.display()))?;
    let records: Vec<ProfileRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid profiles file {}", path.display()))?;

    let identities = select(&RecordProjection, &records, only);
    if identities.is_empty() {
        bail!("No matching profiles in {}", path.display());
    }
    Ok(identities)
}

fn select<S: ProfileSource>(source: &S, records: &[S::Record], only: &[String]) -> Vec<ProfileIdentity> {
    records
        .iter()
        .map(|record| source.identity_of(record))
        .filter(|identity| only.is_empty() || only.iter().any(|id| *id == identity.id))
        .collect()
}
