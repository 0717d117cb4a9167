//! Snapshot creation, retention and restore.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use config::BackupConfig;
use errors::{PortraitError, PortraitResult};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Snapshot directory names sort chronologically with this format.
pub const SNAPSHOT_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

const MAX_SAME_SECOND_SNAPSHOTS: u32 = 999;

const SNAPSHOT_STAMP_LEN: usize = "YYYY-MM-DD_HH-MM-SS".len();

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub snapshot: PathBuf,
    pub files_backed_up: usize,
    pub pruned: Vec<PathBuf>,
    pub created_at: DateTime<Utc>
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_root: PathBuf,
    max_backups: usize,
    default_overwrite: bool
}

impl BackupManager {
    pub fn new(config: &BackupConfig) -> Self {
        Self::with_root(
            config.backup_dir.clone(),
            config.max_backups,
            config.default_overwrite
        )
    }

    pub fn with_root(backup_root: impl Into<PathBuf>, max_backups: usize, default_overwrite: bool) -> Self {
        Self {
            backup_root: backup_root.into(),
            max_backups,
            default_overwrite
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Copy the whole `source_dir` tree into a new snapshot named after the
    /// current local time, then prune old snapshots.
    pub fn create_backup(&self, source_dir: &Path) -> PortraitResult<BackupReport> {
        self.create_backup_at(source_dir, Local::now().naive_local())
    }

    /// Same as [`create_backup`](Self::create_backup) with an explicit
    /// snapshot timestamp.
    pub fn create_backup_at(
        &self,
        source_dir: &Path,
        timestamp: NaiveDateTime
    ) -> PortraitResult<BackupReport> {
        let source_meta = fs::metadata(source_dir)
            .map_err(|e| PortraitError::file_op("read_source", source_dir, e))?;
        if !source_meta.is_dir() {
            return Err(PortraitError::file_op(
                "read_source",
                source_dir,
                io::Error::new(io::ErrorKind::NotADirectory, "backup source is not a directory")
            ));
        }

        fs::create_dir_all(&self.backup_root)
            .map_err(|e| PortraitError::file_op("create_backup_root", &self.backup_root, e))?;

        let snapshot = self.reserve_snapshot_dir(timestamp)?;
        let files_backed_up = match self.copy_tree(source_dir, &snapshot) {
            Ok(count) => count,
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&snapshot) {
                    warn!(
                        snapshot = %snapshot.display(),
                        error = %cleanup,
                        "Failed to remove partial snapshot"
                    );
                }
                return Err(err);
            }
        };

        info!(
            snapshot = %snapshot.display(),
            files = files_backed_up,
            "Backup snapshot created"
        );

        let pruned = self.apply_retention()?;

        Ok(BackupReport {
            snapshot,
            files_backed_up,
            pruned,
            created_at: Utc::now()
        })
    }

    /// Copy every file of `backup_dir` into `target_dir`.
    ///
    /// Existing target files are left untouched unless `overwrite` is set;
    /// skipped files are not counted.
    pub fn restore_images(
        &self,
        backup_dir: &Path,
        target_dir: &Path,
        overwrite: bool
    ) -> PortraitResult<usize> {
        let snapshot_meta =
            fs::metadata(backup_dir).map_err(|e| PortraitError::file_op("read_snapshot", backup_dir, e))?;
        if !snapshot_meta.is_dir() {
            return Err(PortraitError::file_op(
                "read_snapshot",
                backup_dir,
                io::Error::new(io::ErrorKind::NotADirectory, "snapshot is not a directory")
            ));
        }
        fs::create_dir_all(target_dir)
            .map_err(|e| PortraitError::file_op("create_target", target_dir, e))?;

        let mut restored = 0;
        for entry in WalkDir::new(backup_dir).min_depth(1) {
            let entry = entry.map_err(|e| walk_error("read_snapshot", backup_dir, e))?;
            let relative = entry
                .path()
                .strip_prefix(backup_dir)
                .unwrap_or(entry.path());
            let destination = target_dir.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)
                    .map_err(|e| PortraitError::file_op("create_target", &destination, e))?;
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            if destination.exists() && !overwrite {
                debug!(file = %destination.display(), "Keeping existing file");
                continue;
            }

            fs::copy(entry.path(), &destination)
                .map_err(|e| PortraitError::file_op("restore_file", &destination, e))?;
            restored += 1;
        }

        info!(
            snapshot = %backup_dir.display(),
            target = %target_dir.display(),
            restored,
            "Snapshot restored"
        );
        Ok(restored)
    }

    /// Restore the newest snapshot with the configured overwrite default.
    ///
    /// Returns `None` when no snapshot exists.
    pub fn restore_from_latest_backup(&self, target_dir: &Path) -> PortraitResult<Option<usize>> {
        match self.latest_backup()? {
            Some(latest) => self
                .restore_images(&latest, target_dir, self.default_overwrite)
                .map(Some),
            None => {
                warn!(root = %self.backup_root.display(), "No snapshot available to restore");
                Ok(None)
            }
        }
    }

    /// Snapshot directories ordered oldest first.
    pub fn list_backups(&self) -> PortraitResult<Vec<PathBuf>> {
        list_backups(&self.backup_root)
    }

    pub fn latest_backup(&self) -> PortraitResult<Option<PathBuf>> {
        Ok(self.list_backups()?.pop())
    }

    fn reserve_snapshot_dir(&self, timestamp: NaiveDateTime) -> PortraitResult<PathBuf> {
        let base = timestamp.format(SNAPSHOT_FORMAT).to_string();

        for suffix in 0..=MAX_SAME_SECOND_SNAPSHOTS {
            let name = if suffix == 0 {
                base.clone()
            } else {
                format!("{base}_{suffix:03}")
            };
            let candidate = self.backup_root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(PortraitError::file_op("create_snapshot", &candidate, e))
            }
        }

        Err(PortraitError::file_op(
            "create_snapshot",
            self.backup_root.join(base),
            io::Error::new(io::ErrorKind::AlreadyExists, "too many snapshots in the same second")
        ))
    }

    fn copy_tree(&self, source_dir: &Path, snapshot: &Path) -> PortraitResult<usize> {
        // Snapshots stored inside the source tree must not be copied into themselves.
        let backup_root = fs::canonicalize(&self.backup_root).unwrap_or_else(|_| self.backup_root.clone());

        let mut copied = 0;
        let walker = WalkDir::new(source_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                fs::canonicalize(entry.path())
                    .map(|path| !path.starts_with(&backup_root))
                    .unwrap_or(true)
            });

        for entry in walker {
            let entry = entry.map_err(|e| walk_error("read_source", source_dir, e))?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .unwrap_or(entry.path());
            let destination = snapshot.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)
                    .map_err(|e| PortraitError::file_op("create_snapshot", &destination, e))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &destination)
                    .map_err(|e| PortraitError::file_op("copy_file", entry.path(), e))?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    fn apply_retention(&self) -> PortraitResult<Vec<PathBuf>> {
        if self.max_backups == 0 {
            return Ok(Vec::new());
        }

        let snapshots = self.list_backups()?;
        if snapshots.len() <= self.max_backups {
            return Ok(Vec::new());
        }

        let excess = snapshots.len() - self.max_backups;
        let mut pruned = Vec::with_capacity(excess);
        for snapshot in snapshots.into_iter().take(excess) {
            fs::remove_dir_all(&snapshot)
                .map_err(|e| PortraitError::file_op("remove_snapshot", &snapshot, e))?;
            debug!(snapshot = %snapshot.display(), "Pruned old snapshot");
            pruned.push(snapshot);
        }

        info!(pruned = pruned.len(), retained = self.max_backups, "Backup retention applied");
        Ok(pruned)
    }
}

/// Whether `name` is a snapshot directory name: a [`SNAPSHOT_FORMAT`]
/// timestamp, optionally followed by a `_NNN` collision suffix.
pub fn is_snapshot_name(name: &str) -> bool {
    let Some((stamp, suffix)) = name.split_at_checked(SNAPSHOT_STAMP_LEN) else {
        return false;
    };
    let suffix_ok = suffix.is_empty()
        || suffix
            .strip_prefix('_')
            .is_some_and(|n| n.len() == 3 && n.bytes().all(|b| b.is_ascii_digit()));

    suffix_ok && NaiveDateTime::parse_from_str(stamp, SNAPSHOT_FORMAT).is_ok()
}

/// Snapshot directories under `backup_root`, oldest first. Other entries
/// of the root are ignored.
///
/// The root is created when it does not exist yet.
pub fn list_backups(backup_root: &Path) -> PortraitResult<Vec<PathBuf>> {
    fs::create_dir_all(backup_root)
        .map_err(|e| PortraitError::file_op("create_backup_root", backup_root, e))?;

    let entries =
        fs::read_dir(backup_root).map_err(|e| PortraitError::file_op("list_backups", backup_root, e))?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PortraitError::file_op("list_backups", backup_root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| PortraitError::file_op("list_backups", entry.path(), e))?
            .is_dir();
        let named_like_snapshot = entry.file_name().to_str().is_some_and(is_snapshot_name);
        if is_dir && named_like_snapshot {
            snapshots.push(entry.path());
        } else if is_dir {
            debug!(dir = %entry.path().display(), "Ignoring non-snapshot directory");
        }
    }

    snapshots.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(snapshots)
}

fn walk_error(operation: &'static str, root: &Path, err: walkdir::Error) -> PortraitError {
    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    PortraitError::file_op(operation, path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn source_with_image(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("images");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.jpg"), b"a").unwrap();
        source
    }

    #[test]
    fn test_snapshot_named_after_timestamp() {
        let dir = TempDir::new().unwrap();
        let source = source_with_image(&dir);
        let manager = BackupManager::with_root(dir.path().join("backups"), 10, false);

        let report = manager.create_backup_at(&source, at(9, 5, 7)).unwrap();
        assert_eq!(report.snapshot.file_name().unwrap(), "2024-03-15_09-05-07");
        assert_eq!(report.files_backed_up, 1);
        assert!(report.pruned.is_empty());
    }

    #[test]
    fn test_same_second_snapshots_get_suffix() {
        let dir = TempDir::new().unwrap();
        let source = source_with_image(&dir);
        let manager = BackupManager::with_root(dir.path().join("backups"), 0, false);

        let first = manager.create_backup_at(&source, at(10, 0, 0)).unwrap();
        let second = manager.create_backup_at(&source, at(10, 0, 0)).unwrap();
        let third = manager.create_backup_at(&source, at(10, 0, 0)).unwrap();

        assert_eq!(second.snapshot.file_name().unwrap(), "2024-03-15_10-00-00_001");
        assert_eq!(third.snapshot.file_name().unwrap(), "2024-03-15_10-00-00_002");
        assert_eq!(manager.list_backups().unwrap(), vec![
            first.snapshot,
            second.snapshot,
            third.snapshot.clone()
        ]);
        assert_eq!(manager.latest_backup().unwrap(), Some(third.snapshot));
    }

    #[test]
    fn test_missing_source_is_file_operation_error() {
        let dir = TempDir::new().unwrap();
        let manager = BackupManager::with_root(dir.path().join("backups"), 10, false);

        let err = manager.create_backup(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PortraitError::FileOperation { operation: "read_source", .. }));
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_backup_root_inside_source_is_skipped() {
        let dir = TempDir::new().unwrap();
        let source = source_with_image(&dir);
        let manager = BackupManager::with_root(source.join("backups"), 10, false);

        manager.create_backup_at(&source, at(8, 0, 0)).unwrap();
        let second = manager.create_backup_at(&source, at(8, 0, 1)).unwrap();

        assert_eq!(second.files_backed_up, 1);
        assert!(!second.snapshot.join("backups").exists());
    }

    #[test]
    fn test_list_backups_creates_root_and_ignores_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("fresh");

        assert!(list_backups(&root).unwrap().is_empty());
        assert!(root.is_dir());

        fs::write(root.join("notes.txt"), b"not a snapshot").unwrap();
        fs::create_dir(root.join("2024-01-01_00-00-00")).unwrap();
        assert_eq!(list_backups(&root).unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_name_recognition() {
        assert!(is_snapshot_name("2024-03-15_09-05-07"));
        assert!(is_snapshot_name("2024-03-15_09-05-07_001"));
        assert!(!is_snapshot_name("2024-03-15_09-05-07_1"));
        assert!(!is_snapshot_name("2024-03-15_09-05-07-old"));
        assert!(!is_snapshot_name("2024-13-40_09-05-07"));
        assert!(!is_snapshot_name("manual"));
        assert!(!is_snapshot_name(".keep-me"));
        assert!(!is_snapshot_name("é"));
    }

    #[test]
    fn test_restore_from_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let not_a_snapshot = dir.path().join("snapshot.tar");
        fs::write(&not_a_snapshot, b"archive").unwrap();
        let manager = BackupManager::with_root(dir.path().join("backups"), 10, false);

        let err = manager
            .restore_images(&not_a_snapshot, &dir.path().join("target"), false)
            .unwrap_err();
        assert!(matches!(err, PortraitError::FileOperation { operation: "read_snapshot", .. }));
    }
}
