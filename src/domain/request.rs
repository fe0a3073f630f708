//! Execution requests handed to the orchestrator by a tool collaborator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single tool invocation, fully resolved except for validation.
///
/// The argument vector the executor sees is always
/// `program + args + target`, in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Tool identifier recorded in the ledger (e.g. "nmap_basic")
    pub tool: String,

    /// Binary to launch (e.g. "nmap")
    pub program: String,

    /// Host, IP or URL-like target; placed last in the argument vector
    pub target: String,

    /// Flags and flag values, in order
    pub args: Vec<String>,

    /// Hard wall-clock limit for the process
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl ExecutionRequest {
    /// Create a request with no arguments
    pub fn new(
        tool: impl Into<String>,
        program: impl Into<String>,
        target: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            target: target.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The literal argument vector passed to the process launcher
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push(self.target.clone());
        argv
    }

    /// The argument vector joined with spaces, for human inspection only
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
