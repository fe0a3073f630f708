//! The fixed catalogue of tools this bridge can invoke.
//!
//! Each tool is an option record that resolves into an `ExecutionRequest`.
//! Tools never execute anything themselves; they only build requests for
//! the orchestrator.

pub mod nmap;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScanSettings;
use crate::domain::ExecutionRequest;

pub use nmap::{extract_ports, AdvancedScan, BasicScan, PortEntry, ScanType, Timing};

/// An option value outside its enumerated set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolOptionError {
    #[error("Unknown {option} '{value}' (expected one of: {expected})")]
    Unknown {
        option: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Every invocable tool with its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolInvocation {
    NmapBasic(BasicScan),
    NmapAdvanced(AdvancedScan),
}

impl ToolInvocation {
    /// Tool identifier recorded in the ledger
    pub fn name(&self) -> &'static str {
        match self {
            Self::NmapBasic(_) => nmap::BASIC_TOOL,
            Self::NmapAdvanced(_) => nmap::ADVANCED_TOOL,
        }
    }

    /// Timeout this tool runs under
    pub fn timeout(&self, settings: &ScanSettings) -> Duration {
        match self {
            Self::NmapBasic(_) => settings.basic_timeout(),
            Self::NmapAdvanced(_) => settings.advanced_timeout(),
        }
    }

    /// Resolve into a concrete request
    pub fn into_request(self, settings: &ScanSettings) -> ExecutionRequest {
        let timeout = self.timeout(settings);
        match self {
            Self::NmapBasic(scan) => scan.into_request(timeout),
            Self::NmapAdvanced(scan) => scan.into_request(timeout),
        }
    }
}

/// Identifiers of every tool in the catalogue
pub fn tool_names() -> [&'static str; 2] {
    [nmap::BASIC_TOOL, nmap::ADVANCED_TOOL]
}
