//! Session state file and the in-memory fallback used when it cannot be written.
//!
//! The tool assumes a single running instance. Writes are atomic (temp file
//! plus rename) and the read-modify-write in a session toggle holds an advisory
//! lock on a sidecar `.lock` file, but nothing stronger is attempted.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, warn};

use super::state::SessionState;
use crate::error::{Result, TriageError};

const TMP_SUFFIX: &str = "tmp";
const LOCK_SUFFIX: &str = "lock";

/// Reads and writes the session state file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.sidecar(LOCK_SUFFIX)
    }

    /// Load the stored state.
    ///
    /// Ok(None) when the file does not exist or cannot be parsed (the latter
    /// is logged). Other read errors are returned.
    pub fn load(&self) -> Result<Option<SessionState>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<SessionState>(&contents) {
            Ok(state) => Ok(Some(state.sanitized())),
            Err(e) => {
                warn!(
                    "Corrupted session file at {}: {}. Starting from defaults.",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Write the state atomically.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        self.write_atomic(state)
            .map_err(|e| TriageError::Persistence(format!("{}: {}", self.path.display(), e)))
    }

    fn write_atomic(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.sidecar(TMP_SUFFIX);
        let json = serde_json::to_string_pretty(state)?;

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!("Saved session state to {}", self.path.display());
        Ok(())
    }

    /// Take the advisory lock. The lock is released when the file is dropped.
    pub fn lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&file)
            .map_err(|e| TriageError::Persistence(format!("Failed to acquire session lock: {}", e)))?;
        Ok(file)
    }
}

/// Session storage plus the in-memory copy kept after a failed write.
///
/// Once a write fails, the fallback is what later loads return for the rest of
/// the process. A later successful write clears it.
#[derive(Debug)]
pub struct SessionContext {
    store: SessionStore,
    fallback: Option<SessionState>,
}

impl SessionContext {
    pub fn new(store: SessionStore) -> Self {
        Self { store, fallback: None }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn fallback(&self) -> Option<&SessionState> {
        self.fallback.as_ref()
    }

    /// Fallback first, then the file, then defaults. Never fails.
    pub fn load(&self) -> SessionState {
        if let Some(state) = self.fallback {
            debug!("Using in-memory session state");
            return state;
        }
        match self.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::default(),
            Err(e) => {
                warn!("Failed to read session state: {}. Starting from defaults.", e);
                SessionState::default()
            }
        }
    }

    /// Persist the state. Returns false (after logging and keeping the state in
    /// memory) when the write fails.
    pub fn persist(&mut self, state: &SessionState) -> bool {
        match self.store.save(state) {
            Ok(()) => {
                self.fallback = None;
                true
            }
            Err(e) => {
                warn!("{}. Keeping session state in memory for this run.", e);
                self.fallback = Some(*state);
                false
            }
        }
    }

    /// Take the advisory lock if possible; proceed unlocked otherwise.
    pub fn try_lock(&self) -> Option<File> {
        match self.store.lock() {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Proceeding without session lock: {}", e);
                None
            }
        }
    }
}
