//! Durable storage for the comparison baseline.
//!
//! The baseline snapshot is the one piece of state that must survive
//! process restarts: losing it means re-reporting the entire machine as
//! "added". Writes therefore go through a temp-file-then-atomic-rename
//! sequence in the same directory as the target, so a crash mid-write can
//! never corrupt the previously durable copy. Directory and file are
//! created owner-only on Unix.

use crate::error::StoreError;
use crate::model::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "driftscan";
const SNAPSHOT_FILE: &str = "snapshot.json";

/// Returns the default baseline path under the platform state directory.
///
/// - Linux: `~/.local/share/driftscan/snapshot.json`
/// - macOS: `~/Library/Application Support/driftscan/snapshot.json`
/// - Windows: `%LOCALAPPDATA%\driftscan\snapshot.json`
///
/// Falls back to the process temp directory if no data directory can be
/// determined.
pub fn default_snapshot_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(SNAPSHOT_FILE)
}

/// Loads and persists the baseline [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The current target path. This can change once, if the configured
    /// directory turned out to be uncreatable and the store fell back to
    /// the process temp directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted baseline.
    ///
    /// A missing file is not an error; there is simply no baseline yet.
    /// Unreadable or unparseable content is returned as an error; the
    /// on-disk file is left untouched so it can be inspected.
    pub fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };

        let snapshot: Snapshot =
            serde_json::from_slice(&data).map_err(|err| StoreError::Corrupt {
                path: self.path.clone(),
                source: err,
            })?;
        Ok(Some(snapshot))
    }

    /// Persists `snapshot`, replacing the previous baseline atomically.
    ///
    /// If the target directory cannot be created, the store falls back to
    /// a directory under the process temp location and remembers it, so
    /// persistence is not abandoned for the rest of the process lifetime.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let data = serde_json::to_vec(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if let Err(err) = create_private_dir(parent) {
                let fallback_dir = std::env::temp_dir().join(APP_DIR);
                if create_private_dir(&fallback_dir).is_err() {
                    return Err(StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source: err,
                    });
                }
                let fallback = fallback_dir.join(SNAPSHOT_FILE);
                warn!(
                    configured = %self.path.display(),
                    fallback = %fallback.display(),
                    "snapshot directory not creatable, falling back to temp location"
                );
                self.path = fallback;
            }
        }

        let tmp = self.path.with_extension("tmp");
        write_private_file(&tmp, &data).map_err(|err| StoreError::Write {
            path: tmp.clone(),
            source: err,
        })?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Replace {
                path: self.path.clone(),
                source: err,
            });
        }

        debug!(path = %self.path.display(), "baseline snapshot persisted");
        Ok(())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(default_snapshot_path())
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}
