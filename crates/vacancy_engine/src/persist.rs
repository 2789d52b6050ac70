use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use monitor_logging::{monitor_info, monitor_warn};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use vacancy_core::{PersistedState, Subscription, Timestamp, DEFAULT_PERIOD};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("state is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },
    #[error("not enough free disk space")]
    LowDiskSpace,
}

/// Size and disk-space bounds for the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_state_bytes: u64,
    pub min_free_disk_mb: u64,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_state_bytes: 1024 * 1024,
            min_free_disk_mb: 10,
        }
    }
}

/// Precondition check run before writing the state file.
pub trait DiskGuard: Send + Sync {
    fn has_room(&self) -> bool;
}

/// Requires a minimum of free space on the filesystem holding `dir`.
#[derive(Debug, Clone)]
pub struct FreeSpaceGuard {
    dir: PathBuf,
    min_free_bytes: u64,
}

impl FreeSpaceGuard {
    pub fn new(dir: impl Into<PathBuf>, min_free_mb: u64) -> Self {
        Self {
            dir: dir.into(),
            min_free_bytes: min_free_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl DiskGuard for FreeSpaceGuard {
    fn has_room(&self) -> bool {
        match fs2::available_space(&self.dir) {
            Ok(free) => free >= self.min_free_bytes,
            Err(err) => {
                // Unknown free space is not treated as exhaustion.
                monitor_warn!("Could not query free space of {:?}: {}", self.dir, err);
                true
            }
        }
    }
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writer for the directory containing `path`.
    pub fn for_file(path: &Path) -> Self {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::new(dir)
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // rename(2) replaces the target in one step.
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Read the state file, falling back to empty state on any problem.
///
/// Entries with a non-integer chat id or a negative period are dropped; a
/// zero period means the default. The disk guard is not consulted here.
pub fn load_state(path: &Path, limits: &StoreLimits) -> PersistedState {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > limits.max_state_bytes => {
            monitor_warn!(
                "State file {:?} is {} bytes (limit {}), starting with empty state",
                path,
                meta.len(),
                limits.max_state_bytes
            );
            return PersistedState::default();
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return PersistedState::default();
        }
        Err(err) => {
            monitor_warn!("Failed to stat state file {:?}: {}", path, err);
            return PersistedState::default();
        }
    }

    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            monitor_warn!("Failed to read state from {:?}: {}", path, err);
            return PersistedState::default();
        }
    };

    let raw: Value = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(err) => {
            monitor_warn!("Failed to parse state from {:?}: {}", path, err);
            return PersistedState::default();
        }
    };

    let state = parse_state(&raw);
    monitor_info!(
        "Loaded {} subscriptions from {:?} (cursor {:?})",
        state.subscriptions.len(),
        path,
        state.last_update_id
    );
    state
}

fn parse_state(raw: &Value) -> PersistedState {
    let mut state = PersistedState::default();
    let Value::Object(root) = raw else {
        return state;
    };

    if let Some(Value::Object(entries)) = root.get("subscriptions") {
        for (key, entry) in entries {
            let Ok(chat_id) = key.trim().parse::<i64>() else {
                continue;
            };
            if let Some(sub) = parse_subscription(entry) {
                state.subscriptions.insert(chat_id, sub);
            }
        }
    }
    state.last_update_id = root.get("last_update_id").and_then(Value::as_i64);
    state
}

fn parse_subscription(entry: &Value) -> Option<Subscription> {
    let Value::Object(fields) = entry else {
        return None;
    };
    let period_secs = match fields.get("period_secs") {
        None | Some(Value::Null) => DEFAULT_PERIOD.as_secs(),
        Some(value) => match value.as_u64()? {
            0 => DEFAULT_PERIOD.as_secs(),
            secs => secs,
        },
    };
    // A missing due time makes the chat due on the first tick.
    let next_due = match fields.get("next_due") {
        None | Some(Value::Null) => Timestamp::default(),
        Some(value) => Timestamp::from_secs(value.as_u64()?),
    };
    Some(Subscription {
        period_secs,
        next_due,
    })
}

/// Serialize and atomically replace the state file.
pub fn save_state(
    path: &Path,
    state: &PersistedState,
    limits: &StoreLimits,
    guard: &dyn DiskGuard,
) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(state)?;
    let size = content.len() as u64;
    if size > limits.max_state_bytes {
        return Err(PersistError::TooLarge {
            size,
            max: limits.max_state_bytes,
        });
    }
    if !guard.has_room() {
        return Err(PersistError::LowDiskSpace);
    }

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PersistError::OutputDir(format!("no file name in {:?}", path)))?;
    AtomicFileWriter::for_file(path).write(filename, &content)?;
    Ok(())
}
