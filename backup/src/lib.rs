//! # Portrait Backup
//!
//! Timestamped, immutable snapshots of the generated images directory.
//!
//! Each snapshot is a directory under the backup root named
//! `YYYY-MM-DD_HH-MM-SS` (local time), with a zero-padded `_NNN` suffix when
//! several snapshots land in the same second. Names therefore sort
//! chronologically, which is what retention and "latest" rely on. Other
//! entries of the backup root are never treated as snapshots.

pub mod manager;

pub use manager::{BackupManager, BackupReport, SNAPSHOT_FORMAT, is_snapshot_name, list_backups};
