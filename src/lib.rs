//! reconbridge - Audited execution bridge for network reconnaissance tools
//!
//! Lets an external agent run a fixed set of scanners through structured
//! requests, with input validation, hard timeouts, persisted output and an
//! append-only audit trail.
//!
//! # Architecture
//!
//! Every invocation goes through the orchestrator:
//! - Inputs are validated before any process is spawned
//! - Processes are launched from a literal argument vector, never a shell
//! - Raw output is written atomically to a uniquely named artifact
//! - Every attempted execution is appended to the audit ledger
//!
//! # Modules
//!
//! - `core`: Validation, Executor, Artifacts, Ledger, Orchestrator
//! - `domain`: Data structures (ExecutionRequest, ExecutionResult, Artifact, AuditRecord)
//! - `tools`: The tool catalogue (nmap profiles)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Scan the first 1000 ports
//! reconbridge scan basic 10.0.0.1
//!
//! # Review the last five nmap_basic runs
//! reconbridge history --limit 5 --tool nmap_basic
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod tools;

// Re-export main types at crate root for convenience
pub use crate::core::{AuditOutcome, Orchestrator, ScanOutcome, ValidationError};
pub use crate::domain::{Artifact, AuditRecord, AuditStatus, ExecutionRequest, ExecutionResult};
pub use crate::tools::ToolInvocation;
