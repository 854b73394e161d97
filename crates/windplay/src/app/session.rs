//! Session persistence utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::model::GenerationTarget;

const SESSION_DIR: &str = ".windplay";
const SESSION_FILE: &str = "session.json";

/// Snapshot of the playground persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Windfile text as it was in the editor.
    pub document: String,
    /// Target of the output tab that was selected.
    #[serde(default)]
    pub target: GenerationTarget,
    /// RFC 3339 timestamp of the save.
    #[serde(default)]
    pub saved_at: Option<String>,
}

impl SessionSnapshot {
    pub fn capture(document: impl Into<String>, target: GenerationTarget) -> Self {
        Self {
            document: document.into(),
            target,
            saved_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        }
    }
}

/// Persists the playground state to a session file under `.windplay/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    path: PathBuf,
}

impl SessionStore {
    /// Create a new store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(SESSION_DIR).join(SESSION_FILE);
        Self { root, path }
    }

    /// Directory holding the session file, logs, and workspace config.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(SESSION_DIR)
    }

    /// Location of the persisted session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the most recently persisted session snapshot.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file at {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("invalid session data in {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Persist the provided snapshot to disk, creating parent directories as needed.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let dir = self.path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let data = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize session snapshot")?;
        fs::write(&self.path, data)
            .with_context(|| format!("failed to write session file to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_loads_as_none() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = SessionStore::new(temp.path());
        assert!(store.load()?.is_none());
        Ok(())
    }

    #[test]
    fn save_then_load_restores_document_and_target() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = SessionStore::new(temp.path());
        let snapshot = SessionSnapshot::capture("api: v0.0.1\n", GenerationTarget::Bamboo);
        store.save(&snapshot)?;

        assert_eq!(store.path(), temp.path().join(".windplay/session.json"));
        let restored = store.load()?.expect("snapshot present");
        assert_eq!(restored, snapshot);
        assert!(restored.saved_at.is_some());
        Ok(())
    }

    #[test]
    fn corrupt_session_is_an_error() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = SessionStore::new(temp.path());
        fs::create_dir_all(store.state_dir())?;
        fs::write(store.path(), "{not json")?;
        assert!(store.load().is_err());
        Ok(())
    }
}
