//! Process execution with a hard timeout.
//!
//! The argument vector is handed to the OS as-is; nothing is ever passed
//! through a shell. Every way a run can end, including launch failures and
//! timeouts, comes back as an `ExecutionResult`.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ExecutionResult;

/// Something that can run an argument vector
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `argv[0]` with the remaining elements as arguments
    async fn execute(&self, argv: &[String], timeout: Duration) -> ExecutionResult;
}

/// Executor backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, argv: &[String], timeout: Duration) -> ExecutionResult {
        let Some((program, args)) = argv.split_first() else {
            return ExecutionResult::launch_failure("Empty argument vector");
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout can take down everything the tool started
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(%program, error = %e, "Failed to launch process");
                return ExecutionResult::launch_failure(format!(
                    "Failed to launch '{}': {}",
                    program, e
                ));
            }
        };

        // The child leads its group; the id is gone once it is reaped
        let pgid = child.id();

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe
        let mut stdout = child.stdout.take().map(drain);
        let mut stderr = child.stderr.take().map(drain);

        // The budget covers pipe EOF too: a background process holding the
        // pipes open must not extend the run past the limit
        let run = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let stdout = collect(stdout.as_mut()).await;
            let stderr = collect(stderr.as_mut()).await;
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        match run {
            Ok(Ok((status, stdout, stderr))) => {
                ExecutionResult::exited(exit_code(status), stdout, stderr)
            }
            Ok(Err(e)) => {
                terminate(&mut child, pgid, program).await;
                abort(stdout);
                abort(stderr);
                ExecutionResult::launch_failure(format!(
                    "Failed to wait for '{}': {}",
                    program, e
                ))
            }
            Err(_) => {
                terminate(&mut child, pgid, program).await;
                abort(stdout);
                abort(stderr);
                warn!(%program, ?timeout, "Process timed out");
                ExecutionResult::timeout(timeout)
            }
        }
    }
}

/// SIGKILL the child's process group, then kill and reap the child itself
async fn terminate(child: &mut Child, pgid: Option<u32>, program: &str) {
    if let Some(pgid) = pgid {
        kill_group(pgid);
    }

    // Already reaped; only descendants were left
    if child.id().is_none() {
        return;
    }

    // kill() sends SIGKILL and reaps the child
    if let Err(e) = child.kill().await {
        warn!(%program, error = %e, "Failed to kill timed out process");
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

fn drain<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf).await;
        buf
    })
}

/// Wait for a drain task and decode its bytes as text.
///
/// Invalid UTF-8 is replaced with U+FFFD; results carry text, not bytes.
async fn collect(handle: Option<&mut JoinHandle<Vec<u8>>>) -> String {
    match handle {
        Some(handle) => handle
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        None => String::new(),
    }
}

fn abort(handle: Option<JoinHandle<Vec<u8>>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

/// Map an exit status to a non-negative code
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(255)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(255)
}
