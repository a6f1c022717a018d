//! Crash-safe persistence of the match state.
//!
//! Two files live in the log directory:
//!
//! - **Recovery snapshot** (`lastState.json` by default): the full current
//!   state as pretty-printed JSON, overwritten in place on every commit and
//!   read back once at startup.
//! - **Audit log** (`state-history_<run start>.log`): one compact JSON record
//!   per commit, appended and never rewritten. A new file is created for
//!   every process run. It exists for forensic replay only; recovery never
//!   reads it.
//!
//! Both files are flushed to disk synchronously after every write. Command
//! rate is human speed, so the latency is irrelevant next to the guarantee.
//!
//! Only failures that could leave the authoritative record inconsistent are
//! returned as [`PersistError`]. Encode and plain write failures are logged
//! and tolerated: the on-disk copy goes briefly stale, the in-memory state
//! stays authoritative.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use refbox_types::MatchState;
use tracing::{debug, warn};

/// Errors that make persistence unusable. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The log directory could not be created.
    #[error("can not create log directory {path}: {source}")]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A persistence file could not be opened or created.
    #[error("can not open {path}: {source}")]
    Open {
        /// The file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The recovery snapshot could not be read.
    #[error("could not read recovery snapshot {path}: {source}")]
    Read {
        /// The file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The recovery snapshot is at or above the configured size limit.
    #[error("recovery snapshot {path} is {len} bytes, limit is {limit} bytes")]
    SnapshotTooLarge {
        /// The file.
        path: PathBuf,
        /// Bytes read.
        len: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The recovery snapshot is not a valid match state.
    #[error("could not decode recovery snapshot {path}: {source}")]
    Decode {
        /// The file.
        path: PathBuf,
        /// The underlying decode error.
        source: serde_json::Error,
    },

    /// The recovery snapshot could not be truncated before rewriting it.
    #[error("can not truncate recovery snapshot {path}: {source}")]
    Truncate {
        /// The file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Open handles to the recovery snapshot and the audit log.
///
/// The files are closed when the store is dropped.
#[derive(Debug)]
pub struct StateStore {
    last_state_path: PathBuf,
    last_state_file: File,
    history_path: PathBuf,
    history_file: File,
}

impl StateStore {
    /// Create `log_dir` if needed and open both persistence files.
    ///
    /// The audit log is named after `started_at` so every run gets its own
    /// file.
    pub fn open(
        log_dir: &Path,
        last_state_file: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Self, PersistError> {
        fs::create_dir_all(log_dir).map_err(|source| PersistError::CreateDir {
            path: log_dir.to_path_buf(),
            source,
        })?;

        let history_path = log_dir.join(history_file_name(started_at));
        let history_file = owner_only(OpenOptions::new().append(true).create(true))
            .open(&history_path)
            .map_err(|source| PersistError::Open {
                path: history_path.clone(),
                source,
            })?;

        let last_state_path = log_dir.join(last_state_file);
        let last_state_file = owner_only(
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false),
        )
        .open(&last_state_path)
        .map_err(|source| PersistError::Open {
            path: last_state_path.clone(),
            source,
        })?;

        debug!(
            last_state = %last_state_path.display(),
            history = %history_path.display(),
            "Persistence files opened"
        );

        Ok(Self {
            last_state_path,
            last_state_file,
            history_path,
            history_file,
        })
    }

    /// Path of the recovery snapshot.
    pub fn last_state_path(&self) -> &Path {
        &self.last_state_path
    }

    /// Path of this run's audit log.
    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    /// Read the recovery snapshot.
    ///
    /// Returns `None` for an empty file (first start). Content of
    /// `max_bytes` or more is refused rather than silently truncated.
    pub fn read_last_state(&mut self, max_bytes: usize) -> Result<Option<MatchState>, PersistError> {
        let mut buf = Vec::new();
        self.last_state_file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.last_state_file.read_to_end(&mut buf))
            .map_err(|source| PersistError::Read {
                path: self.last_state_path.clone(),
                source,
            })?;

        if buf.len() >= max_bytes {
            return Err(PersistError::SnapshotTooLarge {
                path: self.last_state_path.clone(),
                len: buf.len(),
                limit: max_bytes,
            });
        }
        if buf.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&buf)
            .map(Some)
            .map_err(|source| PersistError::Decode {
                path: self.last_state_path.clone(),
                source,
            })
    }

    /// Overwrite the recovery snapshot with `state`.
    ///
    /// Only a failed truncate is returned: after it the file content is
    /// unknown, so continuing would risk recovering from a corrupt record.
    pub fn save_latest_state(&mut self, state: &MatchState) -> Result<(), PersistError> {
        let json = match serde_json::to_vec_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Can not encode state for recovery snapshot");
                return Ok(());
            }
        };

        self.last_state_file
            .set_len(0)
            .map_err(|source| PersistError::Truncate {
                path: self.last_state_path.clone(),
                source,
            })?;

        let written = self
            .last_state_file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.last_state_file.write_all(&json));
        if let Err(e) = written {
            warn!(error = %e, path = %self.last_state_path.display(), "Could not write recovery snapshot");
        }
        if let Err(e) = self.last_state_file.sync_all() {
            warn!(error = %e, path = %self.last_state_path.display(), "Could not sync recovery snapshot");
        }
        Ok(())
    }

    /// Append `state` as one line to the audit log.
    pub fn append_history(&mut self, state: &MatchState) {
        let mut line = match serde_json::to_vec(state) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Can not encode state for audit log");
                return;
            }
        };
        line.push(b'\n');

        if let Err(e) = self.history_file.write_all(&line) {
            warn!(error = %e, path = %self.history_path.display(), "Could not append to audit log");
        }
        if let Err(e) = self.history_file.sync_all() {
            warn!(error = %e, path = %self.history_path.display(), "Could not sync audit log");
        }
    }
}

#[cfg(test)]
impl StateStore {
    /// Swap the snapshot handle for a read-only one so the next truncate
    /// fails with a real I/O error.
    pub(crate) fn reopen_snapshot_read_only(&mut self) -> std::io::Result<()> {
        self.last_state_file = File::open(&self.last_state_path)?;
        Ok(())
    }
}

/// Audit log file name for a run started at `started_at`.
pub fn history_file_name(started_at: DateTime<Utc>) -> String {
    format!("state-history_{}.log", started_at.format("%Y-%m-%d_%H-%M-%S"))
}

#[cfg(unix)]
fn owner_only(options: &mut OpenOptions) -> &mut OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600)
}

#[cfg(not(unix))]
const fn owner_only(options: &mut OpenOptions) -> &mut OpenOptions {
    options
}
