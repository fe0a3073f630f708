//! Core execution and audit subsystem.
//!
//! This module contains:
//! - Validation: target allow-list and argument deny-list
//! - Executor: argument-vector process execution with a hard timeout
//! - Artifacts: atomic, collision-free persistence of raw output
//! - Ledger: append-only audit trail
//! - Orchestrator: composes the above for one invocation

pub mod artifacts;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod validation;

// Re-export commonly used types
pub use artifacts::{ArtifactStore, FsArtifactStore, StorageError};
pub use executor::{Executor, ProcessExecutor};
pub use ledger::{AuditLedger, LedgerError, SqliteLedger};
pub use orchestrator::{
    validate_request, ArtifactPolicy, AuditOutcome, HistoryError, Orchestrator, ScanOutcome,
};
pub use validation::{
    validate_argument, validate_arguments, validate_target, ValidationError, DENIED_CHARACTERS,
};
