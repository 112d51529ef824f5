//! The YAML files kept next to the database: `workspace.yaml` and
//! `.system.lock`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ADate;

pub const WORKSPACE_FILE_NAME: &str = "workspace.yaml";
pub const SYSTEM_LOCK_FILE_NAME: &str = ".system.lock";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacation {
    pub name: String,
    pub start_date: ADate,
    pub end_date: ADate,
}

/// `workspace.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    pub name: String,
    #[serde(default)]
    pub space_id: Option<String>,
    #[serde(default)]
    pub token_v2: Option<String>,
    #[serde(default)]
    pub vacations: Vec<Vacation>,
}

/// `.system.lock`. Keys this build does not know about are kept as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemLock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ref_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_ref_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

/// Locates the bootstrap files under a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapFiles {
    data_dir: PathBuf,
}

impl BootstrapFiles {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.data_dir.join(WORKSPACE_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(SYSTEM_LOCK_FILE_NAME)
    }

    /// `None` when the workspace was never initialised.
    pub fn load_workspace(&self) -> Result<Option<WorkspaceFile>, BootstrapError> {
        let path = self.workspace_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(BootstrapError::Io { path, source }),
        };
        serde_yaml::from_str(&raw)
            .map(Some)
            .map_err(|source| BootstrapError::Yaml { path, source })
    }

    pub fn save_workspace(&self, workspace: &WorkspaceFile) -> Result<(), BootstrapError> {
        let path = self.workspace_path();
        let raw = serde_yaml::to_string(workspace).map_err(|source| BootstrapError::Yaml {
            path: path.clone(),
            source,
        })?;
        self.write(&path, &raw)
    }

    /// Never fails: a missing, empty or unreadable lock reads as `{}`.
    pub fn load_lock(&self) -> SystemLock {
        let path = self.lock_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot read system lock");
                }
                return SystemLock::default();
            }
        };
        if raw.trim().is_empty() {
            return SystemLock::default();
        }
        match serde_yaml::from_str::<SystemLock>(&raw) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt system lock, ignoring it");
                SystemLock::default()
            }
        }
    }

    pub fn save_lock(&self, lock: &SystemLock) -> Result<(), BootstrapError> {
        let path = self.lock_path();
        let raw = serde_yaml::to_string(lock).map_err(|source| BootstrapError::Yaml {
            path: path.clone(),
            source,
        })?;
        self.write(&path, &raw)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), BootstrapError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| BootstrapError::Io {
            path: self.data_dir.clone(),
            source,
        })?;
        std::fs::write(path, contents).map_err(|source| BootstrapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_workspace_file_means_uninitialised() {
        let dir = tempfile::tempdir().unwrap();
        let files = BootstrapFiles::new(dir.path());
        assert_eq!(files.load_workspace().unwrap(), None);
    }

    #[test]
    fn workspace_file_defaults_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(WORKSPACE_FILE_NAME), "name: Home\n").unwrap();
        let workspace = BootstrapFiles::new(dir.path()).load_workspace().unwrap().unwrap();
        assert_eq!(workspace.name, "Home");
        assert!(workspace.vacations.is_empty());
        assert_eq!(workspace.token_v2, None);
    }

    #[test]
    fn empty_or_corrupt_lock_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = BootstrapFiles::new(dir.path());
        std::fs::write(files.lock_path(), "").unwrap();
        assert_eq!(files.load_lock(), SystemLock::default());
        std::fs::write(files.lock_path(), ":: not yaml [").unwrap();
        assert_eq!(files.load_lock(), SystemLock::default());
        std::fs::write(files.lock_path(), "- a\n- list\n").unwrap();
        assert_eq!(files.load_lock(), SystemLock::default());
    }

    #[test]
    fn lock_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let files = BootstrapFiles::new(dir.path());
        std::fs::write(files.lock_path(), "theme: dark\nuser_ref_id: 3\n").unwrap();
        let mut lock = files.load_lock();
        assert_eq!(lock.user_ref_id, Some(3));
        lock.workspace_ref_id = Some(1);
        files.save_lock(&lock).unwrap();

        let reloaded = files.load_lock();
        assert_eq!(reloaded.workspace_ref_id, Some(1));
        assert_eq!(
            reloaded.other.get("theme"),
            Some(&serde_yaml::Value::String("dark".to_string()))
        );
    }
}
