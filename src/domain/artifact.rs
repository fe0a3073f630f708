//! Raw tool output persisted to disk.
//!
//! Artifacts are written once and never mutated or deleted by this crate.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A persisted tool output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Tool that produced the output
    pub tool: String,

    /// Target the tool was pointed at
    pub target: String,

    /// When the artifact was written
    pub created_at: DateTime<Utc>,

    /// Location of the artifact file
    pub path: PathBuf,

    /// SHA-256 of the content, hex encoded
    pub sha256: String,

    /// Size in bytes
    pub size_bytes: u64,
}

impl Artifact {
    /// Describe content that has been written to `path`
    pub fn new(tool: &str, target: &str, created_at: DateTime<Utc>, path: PathBuf, content: &str) -> Self {
        Self {
            tool: tool.to_string(),
            target: target.to_string(),
            created_at,
            path,
            sha256: digest(content),
            size_bytes: content.len() as u64,
        }
    }

    /// The reference recorded in the audit ledger
    pub fn reference(&self) -> String {
        self.path.display().to_string()
    }
}

/// SHA-256 of content, hex encoded
pub fn digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
