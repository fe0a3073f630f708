//! Audit ledger records.
//!
//! Records are immutable once appended. The ledger assigns the sequence id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::ExecutionResult;

/// Outcome recorded for an attempted execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl From<&ExecutionResult> for AuditStatus {
    fn from(result: &ExecutionResult) -> Self {
        if result.succeeded {
            Self::Success
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown audit status: {}", other)),
        }
    }
}

/// Fields supplied by the caller of `append`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub target: String,
    /// Fully expanded argument vector joined with spaces
    pub command: String,
    pub status: AuditStatus,
    pub artifact: Option<String>,
}

impl AuditEntry {
    /// Entry stamped with the current time
    pub fn new(
        tool: impl Into<String>,
        target: impl Into<String>,
        command: impl Into<String>,
        status: AuditStatus,
        artifact: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            tool: tool.into(),
            target: target.into(),
            command: command.into(),
            status,
            artifact,
        }
    }
}

/// A record as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Monotonic, never reused
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub target: String,
    pub command: String,
    pub status: AuditStatus,
    pub artifact: Option<String>,
}
