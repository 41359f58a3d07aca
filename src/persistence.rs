//! Durable snapshot of the minimal session identity.
//!
//! A full page reload (or process restart) loses every in-memory structure
//! and the relay-assigned connection id with it. What survives is a
//! [`PersistedSnapshot`]: username, room code and who was drawing. The
//! connection manager reads it once per (re)connect to rejoin the room, and
//! the session shows it provisionally until the relay sends live state.
//!
//! Snapshots are never deleted. A stale snapshot is harmless: the next
//! authoritative event replaces whatever it seeded.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScribbleError};
use crate::protocol::is_room_code;

/// What is remembered across a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersistedSnapshot {
    pub username: String,
    pub room_code: String,
    #[serde(default)]
    pub is_drawer: bool,
    #[serde(default)]
    pub drawer_username: Option<String>,
}

impl PersistedSnapshot {
    /// Returns `true` if the snapshot holds enough to issue a `join_room`.
    pub fn is_rejoinable(&self) -> bool {
        !self.username.trim().is_empty() && is_room_code(&self.room_code)
    }
}

/// Key/value backend for the snapshot.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Read the last saved snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreadable or holds garbage.
    fn load(&self) -> Result<Option<PersistedSnapshot>>;

    /// Replace the saved snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, snapshot: &PersistedSnapshot) -> Result<()>;
}

/// Snapshot kept in process memory. Survives reconnects, not restarts.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<PersistedSnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`, as if a previous page had saved it.
    pub fn with_snapshot(snapshot: PersistedSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<PersistedSnapshot>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// Snapshot stored as a JSON file.
///
/// Writes go to a uniquely named sibling file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<PersistedSnapshot>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            ScribbleError::Persistence(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// Shared handle to the snapshot backend.
///
/// Cloned into the connection loop (which reads) and the session (which
/// writes). Backend errors are logged and swallowed here: a missing snapshot
/// only costs the automatic rejoin, never correctness.
#[derive(Clone)]
pub struct PersistenceBridge {
    store: Arc<dyn SnapshotStore>,
}

impl PersistenceBridge {
    pub fn new(store: impl SnapshotStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Bridge over a fresh [`MemorySnapshotStore`].
    pub fn in_memory() -> Self {
        Self::new(MemorySnapshotStore::new())
    }

    /// Last saved snapshot, if any could be read.
    pub fn load(&self) -> Option<PersistedSnapshot> {
        match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load session snapshot");
                None
            }
        }
    }

    /// Last saved snapshot, only if it is complete enough to rejoin with.
    pub fn rejoin_target(&self) -> Option<PersistedSnapshot> {
        self.load().filter(PersistedSnapshot::is_rejoinable)
    }

    /// Save `snapshot`, logging instead of failing.
    pub fn record(&self, snapshot: &PersistedSnapshot) {
        match self.store.save(snapshot) {
            Ok(()) => tracing::debug!(
                room_code = %snapshot.room_code,
                is_drawer = snapshot.is_drawer,
                "session snapshot saved"
            ),
            Err(e) => tracing::warn!(error = %e, "failed to save session snapshot"),
        }
    }
}

impl fmt::Debug for PersistenceBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceBridge").finish_non_exhaustive()
    }
}
