//! Domain types for the execution bridge.
//!
//! This module contains the plain data that flows through one invocation:
//! - ExecutionRequest: what to run
//! - ExecutionResult: how it ended
//! - Artifact: persisted raw output
//! - AuditRecord: the ledger's view of an attempted execution

pub mod artifact;
pub mod audit;
pub mod request;
pub mod result;

// Re-export commonly used types
pub use artifact::Artifact;
pub use audit::{AuditEntry, AuditRecord, AuditStatus};
pub use request::ExecutionRequest;
pub use result::{
    ExecutionResult, LAUNCH_FAILURE_EXIT_STATUS, TIMEOUT_EXIT_STATUS, TIMEOUT_MARKER,
};
