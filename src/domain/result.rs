//! Normalised outcome of a process execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exit status reported when the process outlived its timeout.
pub const TIMEOUT_EXIT_STATUS: i32 = -1;

/// Exit status reported when the process could not be launched at all.
pub const LAUNCH_FAILURE_EXIT_STATUS: i32 = -2;

/// Marker placed at the start of stderr on timeout
pub const TIMEOUT_MARKER: &str = "Command timeout exceeded";

/// Every way an execution can end, in one shape.
///
/// `succeeded` is true iff `exit_status == 0`. Real process statuses are
/// never negative, so the two sentinels above are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    /// Result for a process that ran to completion
    pub fn exited(exit_status: i32, stdout: String, stderr: String) -> Self {
        Self {
            succeeded: exit_status == 0,
            exit_status,
            stdout,
            stderr,
        }
    }

    /// Result for a process killed after exceeding its timeout
    pub fn timeout(limit: Duration) -> Self {
        Self {
            succeeded: false,
            exit_status: TIMEOUT_EXIT_STATUS,
            stdout: String::new(),
            stderr: format!("{} after {:?}", TIMEOUT_MARKER, limit),
        }
    }

    /// Result for a process that never started
    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_status: LAUNCH_FAILURE_EXIT_STATUS,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.exit_status == TIMEOUT_EXIT_STATUS
    }

    pub fn launch_failed(&self) -> bool {
        self.exit_status == LAUNCH_FAILURE_EXIT_STATUS
    }
}
