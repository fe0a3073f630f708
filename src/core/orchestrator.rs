//! Scan orchestrator.
//!
//! One invocation moves through
//! validate → execute → persist artifact (or skip) → audit → return.
//! Validation failures stop before anything is spawned, written or audited.
//! Every attempted execution is audited, whatever its outcome. Nothing is
//! retried here: re-running a reconnaissance tool has external side effects,
//! so that decision belongs to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::ResolvedConfig;
use crate::domain::{Artifact, AuditEntry, AuditRecord, AuditStatus, ExecutionRequest, ExecutionResult};

use super::artifacts::{ArtifactStore, FsArtifactStore, StorageError};
use super::executor::{Executor, ProcessExecutor};
use super::ledger::{AuditLedger, LedgerError, SqliteLedger};
use super::validation::{validate_argument, validate_arguments, validate_target, ValidationError};

/// When raw output is persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactPolicy {
    /// Persist successful runs and any run that wrote to stdout
    #[default]
    OutputPresent,

    /// Persist successful runs only
    SuccessOnly,
}

impl ArtifactPolicy {
    pub fn should_persist(&self, result: &ExecutionResult) -> bool {
        match self {
            Self::OutputPresent => result.succeeded || !result.stdout.is_empty(),
            Self::SuccessOnly => result.succeeded,
        }
    }
}

/// Whether the audit trail recorded this invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum AuditOutcome {
    /// Appended with this sequence id
    Recorded(i64),

    /// The ledger write failed; the scan result is still valid
    Impaired(String),
}

impl AuditOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Recorded(id) => Some(*id),
            Self::Impaired(_) => None,
        }
    }
}

/// Everything handed back for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub request: ExecutionRequest,

    /// The argument vector as executed, joined for inspection
    pub command: String,

    pub result: ExecutionResult,

    /// Persisted output, if any
    pub artifact: Option<Artifact>,

    /// Why persisting output failed, if it did
    pub artifact_error: Option<String>,

    pub audit: AuditOutcome,
}

impl ScanOutcome {
    pub fn artifact_reference(&self) -> Option<String> {
        self.artifact.as_ref().map(Artifact::reference)
    }
}

/// Errors from the history query surface
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Composes validation, execution, artifact storage and auditing
pub struct Orchestrator {
    executor: Arc<dyn Executor>,
    artifacts: Arc<dyn ArtifactStore>,
    ledger: Arc<dyn AuditLedger>,
    policy: ArtifactPolicy,
}

impl Orchestrator {
    /// Build from explicit collaborators
    pub fn new(
        executor: Arc<dyn Executor>,
        artifacts: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn AuditLedger>,
    ) -> Self {
        Self {
            executor,
            artifacts,
            ledger,
            policy: ArtifactPolicy::default(),
        }
    }

    /// Override the artifact policy
    pub fn with_policy(mut self, policy: ArtifactPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initialise storage from configuration and wire up the default backends.
    ///
    /// Safe to call when storage already exists.
    pub async fn open(config: &ResolvedConfig) -> anyhow::Result<Self> {
        let artifacts = FsArtifactStore::open(&config.results_dir).await?;
        let ledger = SqliteLedger::open(&config.db_path).await?;

        info!(
            db = %ledger.path().display(),
            results = %artifacts.root().display(),
            "Storage initialised"
        );

        Ok(Self::new(
            Arc::new(ProcessExecutor::new()),
            Arc::new(artifacts),
            Arc::new(ledger),
        )
        .with_policy(config.artifacts.policy))
    }

    /// Run one request end to end
    #[instrument(skip(self, request), fields(tool = %request.tool))]
    pub async fn run(&self, request: ExecutionRequest) -> Result<ScanOutcome, ValidationError> {
        if let Err(e) = validate_request(&request) {
            // The offending value stays out of the logs
            warn!(kind = e.kind(), "Request rejected");
            return Err(e);
        }

        let argv = request.argv();
        let command = request.command_line();
        info!(scan_target = %request.target, timeout = ?request.timeout, "Executing");

        let result = self.executor.execute(&argv, request.timeout).await;

        if result.succeeded {
            info!(exit_status = result.exit_status, "Execution succeeded");
        } else {
            warn!(
                exit_status = result.exit_status,
                timed_out = result.timed_out(),
                launch_failed = result.launch_failed(),
                "Execution failed"
            );
        }

        let (artifact, artifact_error) = if self.policy.should_persist(&result) {
            match self.persist(&request, &result).await {
                Ok(artifact) => (Some(artifact), None),
                Err(e) => {
                    warn!(error = %e, "Artifact not saved");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let entry = AuditEntry::new(
            request.tool.clone(),
            request.target.clone(),
            command.clone(),
            AuditStatus::from(&result),
            artifact.as_ref().map(Artifact::reference),
        );
        let audit = match self.ledger.append(entry).await {
            Ok(id) => AuditOutcome::Recorded(id),
            Err(e) => {
                error!(error = %e, "Audit record not written");
                AuditOutcome::Impaired(e.to_string())
            }
        };

        Ok(ScanOutcome {
            request,
            command,
            result,
            artifact,
            artifact_error,
            audit,
        })
    }

    async fn persist(
        &self,
        request: &ExecutionRequest,
        result: &ExecutionResult,
    ) -> Result<Artifact, StorageError> {
        self.artifacts
            .save(&request.tool, &request.target, &result.stdout)
            .await
    }

    /// The `limit` most recent audit records, newest first
    pub async fn history(
        &self,
        limit: usize,
        tool: Option<&str>,
    ) -> Result<Vec<AuditRecord>, HistoryError> {
        if let Some(tool) = tool {
            validate_argument(tool)?;
        }
        Ok(self.ledger.query(limit, tool).await?)
    }

    /// Read a persisted artifact back
    pub async fn load_artifact(&self, artifact: &Artifact) -> Result<String, StorageError> {
        self.artifacts.load(&artifact.path).await
    }
}

/// Check every externally supplied part of a request
pub fn validate_request(request: &ExecutionRequest) -> Result<(), ValidationError> {
    validate_target(&request.target)?;
    validate_arguments(&request.args)?;
    Ok(())
}
