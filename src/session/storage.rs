//! Session persistence
//!
//! In memory for a single process, or one JSON file per session under a directory.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::RefinementSession;
use crate::log_debug;

/// Storage backend for refinement sessions
pub trait SessionStore: Send + Sync {
    fn load(&self, id: Uuid) -> Result<Option<RefinementSession>>;

    fn save(&self, session: &RefinementSession) -> Result<()>;

    fn remove(&self, id: Uuid) -> Result<()>;

    /// Drop sessions idle for longer than `ttl`, returning how many were dropped
    fn purge_expired(&self, ttl: Duration) -> Result<usize>;
}

/// Process-local session map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, RefinementSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: Uuid) -> Result<Option<RefinementSession>> {
        Ok(self.sessions.read().get(&id).cloned())
    }

    fn save(&self, session: &RefinementSession) -> Result<()> {
        self.sessions.write().insert(session.id, session.clone());
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions.write().remove(&id);
        Ok(())
    }

    fn purge_expired(&self, ttl: Duration) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, ttl));
        Ok(before - sessions.len())
    }
}

/// One `<id>.json` file per session
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create the store, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create sessions directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomic write using temp file + rename
    fn atomic_write(path: &Path, session: &RefinementSession) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })
    }

    fn read_session(path: &Path) -> Result<Option<RefinementSession>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(session))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, id: Uuid) -> Result<Option<RefinementSession>> {
        Self::read_session(&self.session_path(id))
    }

    fn save(&self, session: &RefinementSession) -> Result<()> {
        Self::atomic_write(&self.session_path(session.id), session)
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        let path = self.session_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn purge_expired(&self, ttl: Duration) -> Result<usize> {
        let now = Utc::now();
        let mut purged = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            match Self::read_session(&path) {
                Ok(Some(session)) if session.is_expired(now, ttl) => {
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    purged += 1;
                }
                Ok(_) => {}
                Err(e) => log_debug!("Session store: skipping unreadable {}: {}", path.display(), e),
            }
        }
        Ok(purged)
    }
}
