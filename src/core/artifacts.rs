//! File-based artifact store for raw tool output.
//!
//! Each artifact gets its own file named
//! `{tool}_{target}_{YYYYmmdd_HHMMSS_ffffff}_{token}.txt`, where `target` has
//! path-like characters replaced and `token` is random. Content is written to
//! a temporary file in the same directory and renamed into place, so readers
//! never see a partial artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::domain::Artifact;

/// Artifact storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to prepare artifact directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact writer task failed: {0}")]
    Task(String),
}

/// Where raw tool output goes
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist content and describe where it went
    async fn save(&self, tool: &str, target: &str, content: &str) -> Result<Artifact, StorageError>;

    /// Read an artifact back by its reference
    async fn load(&self, reference: &Path) -> Result<String, StorageError>;
}

/// Artifact store rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open a store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| StorageError::Directory {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// Directory artifacts are written to
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(&self, tool: &str, target: &str, content: &str) -> Result<Artifact, StorageError> {
        let created_at = Utc::now();
        let path = self.root.join(artifact_file_name(tool, target, created_at));

        let root = self.root.clone();
        let dest = path.clone();
        let bytes = content.as_bytes().to_vec();
        tokio::task::spawn_blocking(move || write_atomically(&root, &dest, &bytes))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        Ok(Artifact::new(tool, target, created_at, path, content))
    }

    async fn load(&self, reference: &Path) -> Result<String, StorageError> {
        fs::read_to_string(reference)
            .await
            .map_err(|source| StorageError::Read {
                path: reference.to_path_buf(),
                source,
            })
    }
}

/// Build a collision-resistant file name for an artifact
pub fn artifact_file_name(tool: &str, target: &str, created_at: DateTime<Utc>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}.txt",
        filesystem_safe(tool),
        filesystem_safe(target),
        created_at.format("%Y%m%d_%H%M%S_%6f"),
        &token[..8]
    )
}

/// Replace anything that is not alphanumeric, `.` or `-` with `_`
fn filesystem_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_atomically(dir: &Path, dest: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let write_err = |source| StorageError::Write {
        path: dest.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist_noclobber(dest)
        .map_err(|e| write_err(e.error))?;
    Ok(())
}
