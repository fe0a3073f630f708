//! Orchestrator Integration Tests
//!
//! Tests for the validate → execute → persist → audit flow, including the
//! no-side-effect guarantee for rejected requests and degraded storage.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reconbridge::config::ResolvedConfig;
use reconbridge::core::{
    ArtifactPolicy, ArtifactStore, AuditLedger, AuditOutcome, Executor, FsArtifactStore,
    LedgerError, Orchestrator, SqliteLedger, StorageError, ValidationError,
};
use reconbridge::domain::{
    Artifact, AuditEntry, AuditRecord, AuditStatus, ExecutionRequest, ExecutionResult,
};
use reconbridge::tools::{BasicScan, ToolInvocation};
use tempfile::TempDir;

/// Executor that returns a canned result and counts calls
struct FakeExecutor {
    result: ExecutionResult,
    calls: AtomicUsize,
    last_argv: std::sync::Mutex<Vec<String>>,
}

impl FakeExecutor {
    fn new(result: ExecutionResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
            last_argv: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(&self, argv: &[String], _timeout: Duration) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_argv.lock().unwrap() = argv.to_vec();
        self.result.clone()
    }
}

/// Artifact store whose writes always fail
struct BrokenArtifactStore;

#[async_trait]
impl ArtifactStore for BrokenArtifactStore {
    async fn save(&self, _tool: &str, _target: &str, _content: &str) -> Result<Artifact, StorageError> {
        Err(StorageError::Write {
            path: "/nowhere/artifact.txt".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "No space left on device"),
        })
    }

    async fn load(&self, reference: &Path) -> Result<String, StorageError> {
        Err(StorageError::Read {
            path: reference.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        })
    }
}

/// Ledger whose appends always fail
struct BrokenLedger;

#[async_trait]
impl AuditLedger for BrokenLedger {
    async fn append(&self, _entry: AuditEntry) -> Result<i64, LedgerError> {
        Err(LedgerError::Task("disk I/O error".to_string()))
    }

    async fn query(&self, _limit: usize, _tool: Option<&str>) -> Result<Vec<AuditRecord>, LedgerError> {
        Ok(Vec::new())
    }
}

struct Harness {
    temp: TempDir,
    artifacts: Arc<FsArtifactStore>,
    ledger: Arc<SqliteLedger>,
}

impl Harness {
    async fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let artifacts = Arc::new(FsArtifactStore::open(temp.path().join("results")).await.unwrap());
        let ledger = Arc::new(SqliteLedger::open(temp.path().join("scans.db")).await.unwrap());
        Self {
            temp,
            artifacts,
            ledger,
        }
    }

    fn orchestrator(&self, executor: Arc<dyn Executor>) -> Orchestrator {
        Orchestrator::new(executor, self.artifacts.clone(), self.ledger.clone())
    }

    fn artifact_count(&self) -> usize {
        std::fs::read_dir(self.temp.path().join("results")).unwrap().count()
    }
}

fn basic_request(target: &str, ports: &str) -> ExecutionRequest {
    BasicScan::new(target).ports(ports).into_request(Duration::from_secs(5))
}

#[tokio::test]
async fn test_invalid_target_has_no_side_effects() {
    let harness = Harness::new().await;
    let executor = FakeExecutor::new(ExecutionResult::exited(0, "x".into(), String::new()));
    let orchestrator = harness.orchestrator(executor.clone());

    let err = orchestrator
        .run(basic_request("10.0.0.1; rm -rf /", "1-1000"))
        .await
        .unwrap_err();

    assert!(matches!(err, ValidationError::InvalidFormat(_)));
    assert_eq!(executor.calls(), 0);
    assert_eq!(harness.artifact_count(), 0);
    assert_eq!(harness.ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_argument_has_no_side_effects() {
    let harness = Harness::new().await;
    let executor = FakeExecutor::new(ExecutionResult::exited(0, "x".into(), String::new()));
    let orchestrator = harness.orchestrator(executor.clone());

    for bad in ["1-1000;reboot", "$(id)", "80`x`", "22|nc", "1\n2"] {
        let err = orchestrator
            .run(basic_request("10.0.0.1", bad))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCharacter(_)), "{:?}", bad);
    }

    assert_eq!(executor.calls(), 0);
    assert_eq!(harness.artifact_count(), 0);
    assert_eq!(harness.ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_success_persists_artifact_and_audits() {
    let harness = Harness::new().await;
    let stdout = "PORT   STATE SERVICE\n22/tcp open  ssh\n";
    let executor = FakeExecutor::new(ExecutionResult::exited(0, stdout.into(), String::new()));
    let orchestrator = harness.orchestrator(executor.clone());

    let outcome = orchestrator.run(basic_request("10.0.0.1", "22")).await.unwrap();

    assert!(outcome.result.succeeded);
    assert_eq!(
        *executor.last_argv.lock().unwrap(),
        vec!["nmap", "-sS", "-T2", "-p", "22", "10.0.0.1"]
    );
    assert_eq!(outcome.command, "nmap -sS -T2 -p 22 10.0.0.1");

    let artifact = outcome.artifact.clone().expect("artifact saved");
    assert_eq!(orchestrator.load_artifact(&artifact).await.unwrap(), stdout);

    let id = outcome.audit.id().expect("audit recorded");
    let record = harness.ledger.get(id).await.unwrap().unwrap();
    assert_eq!(record.tool, "nmap_basic");
    assert_eq!(record.target, "10.0.0.1");
    assert_eq!(record.command, outcome.command);
    assert_eq!(record.status, AuditStatus::Success);
    assert_eq!(record.artifact, Some(artifact.reference()));
}

#[tokio::test]
async fn test_failure_without_output_is_audited_without_artifact() {
    let harness = Harness::new().await;
    let executor = FakeExecutor::new(ExecutionResult::exited(1, String::new(), "Failed to resolve".into()));
    let orchestrator = harness.orchestrator(executor);

    let outcome = orchestrator.run(basic_request("no.such.host", "80")).await.unwrap();

    assert!(!outcome.result.succeeded);
    assert!(outcome.artifact.is_none());
    assert!(outcome.artifact_error.is_none());
    assert_eq!(harness.artifact_count(), 0);

    let records = harness.ledger.query(10, None).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Failed);
    assert_eq!(records[0].artifact, None);
}

#[tokio::test]
async fn test_timeout_is_audited_as_failed() {
    let harness = Harness::new().await;
    let executor = FakeExecutor::new(ExecutionResult::timeout(Duration::from_secs(5)));
    let orchestrator = harness.orchestrator(executor.clone());

    let outcome = orchestrator.run(basic_request("10.0.0.1", "1-1000")).await.unwrap();

    assert!(outcome.result.timed_out());
    assert_eq!(executor.calls(), 1, "no automatic retry");
    let records = harness.ledger.query(10, Some("nmap_basic")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AuditStatus::Failed);
}

#[tokio::test]
async fn test_partial_output_policy() {
    let harness = Harness::new().await;
    let failed_with_output = ExecutionResult::exited(1, "22/tcp open ssh\n".into(), "interrupted".into());

    let keep = harness.orchestrator(FakeExecutor::new(failed_with_output.clone()));
    let outcome = keep.run(basic_request("10.0.0.1", "22")).await.unwrap();
    assert!(outcome.artifact.is_some());

    let skip = harness
        .orchestrator(FakeExecutor::new(failed_with_output))
        .with_policy(ArtifactPolicy::SuccessOnly);
    let outcome = skip.run(basic_request("10.0.0.1", "22")).await.unwrap();
    assert!(outcome.artifact.is_none());

    assert_eq!(harness.artifact_count(), 1);
    assert_eq!(harness.ledger.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_artifact_failure_still_audits() {
    let harness = Harness::new().await;
    let orchestrator = Orchestrator::new(
        FakeExecutor::new(ExecutionResult::exited(0, "output".into(), String::new())),
        Arc::new(BrokenArtifactStore),
        harness.ledger.clone(),
    );

    let outcome = orchestrator.run(basic_request("10.0.0.1", "80")).await.unwrap();

    assert!(outcome.result.succeeded);
    assert!(outcome.artifact.is_none());
    assert!(outcome.artifact_error.unwrap().contains("No space left on device"));

    let id = outcome.audit.id().expect("audit recorded");
    let record = harness.ledger.get(id).await.unwrap().unwrap();
    assert_eq!(record.status, AuditStatus::Success);
    assert_eq!(record.artifact, None);
}

#[tokio::test]
async fn test_ledger_failure_is_reported_separately() {
    let harness = Harness::new().await;
    let orchestrator = Orchestrator::new(
        FakeExecutor::new(ExecutionResult::exited(0, "output".into(), String::new())),
        harness.artifacts.clone(),
        Arc::new(BrokenLedger),
    );

    let outcome = orchestrator.run(basic_request("10.0.0.1", "80")).await.unwrap();

    assert!(outcome.result.succeeded);
    assert!(outcome.artifact.is_some());
    match outcome.audit {
        AuditOutcome::Impaired(message) => assert!(message.contains("disk I/O error")),
        other => panic!("expected impaired audit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_history_validates_tool_filter() {
    let harness = Harness::new().await;
    let orchestrator = harness.orchestrator(FakeExecutor::new(ExecutionResult::exited(
        0,
        String::new(),
        String::new(),
    )));

    orchestrator.run(basic_request("10.0.0.1", "80")).await.unwrap();

    assert_eq!(orchestrator.history(10, Some("nmap_basic")).await.unwrap().len(), 1);
    assert!(orchestrator.history(10, Some("x' OR '1'='1")).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_end_to_end_with_real_process() {
    let temp = TempDir::new().unwrap();
    let config = ResolvedConfig::with_home(temp.path().to_path_buf());
    let orchestrator = Orchestrator::open(&config).await.unwrap();

    let request = ExecutionRequest::new("echo", "echo", "hello", Duration::from_secs(10));
    let outcome = orchestrator.run(request).await.unwrap();

    assert!(outcome.result.succeeded);
    assert_eq!(outcome.result.exit_status, 0);
    assert!(outcome.result.stdout.contains("hello"));

    let artifact = outcome.artifact.expect("artifact saved");
    assert!(artifact.path.starts_with(&config.results_dir));
    assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), "hello\n");

    let history = orchestrator.history(5, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].command, "echo hello");
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_tool_binary_is_audited() {
    let temp = TempDir::new().unwrap();
    let config = ResolvedConfig::with_home(temp.path().to_path_buf());
    let orchestrator = Orchestrator::open(&config).await.unwrap();

    let request = ExecutionRequest::new(
        "ghost",
        "reconbridge-missing-binary-91d2",
        "10.0.0.1",
        Duration::from_secs(5),
    );
    let outcome = orchestrator.run(request).await.unwrap();

    assert!(outcome.result.launch_failed());
    assert!(outcome.artifact.is_none());
    let history = orchestrator.history(5, Some("ghost")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, AuditStatus::Failed);
}

#[tokio::test]
async fn test_tool_invocation_flows_through() {
    let harness = Harness::new().await;
    let executor = FakeExecutor::new(ExecutionResult::exited(0, String::new(), String::new()));
    let orchestrator = harness.orchestrator(executor.clone());

    let invocation = ToolInvocation::NmapBasic(BasicScan::new("scanme.nmap.org"));
    let request = invocation.into_request(&Default::default());
    assert_eq!(request.timeout, Duration::from_secs(600));

    orchestrator.run(request).await.unwrap();
    assert_eq!(
        executor.last_argv.lock().unwrap().last().map(String::as_str),
        Some("scanme.nmap.org")
    );
}
