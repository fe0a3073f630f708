//! Nmap scan profiles.
//!
//! Every option a caller may toggle is an enumerated field here; the only
//! free-form values left are the target and the port specification, and
//! both are validated by the orchestrator before anything is spawned.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ExecutionRequest;

use super::ToolOptionError;

pub const NMAP_BINARY: &str = "nmap";
pub const BASIC_TOOL: &str = "nmap_basic";
pub const ADVANCED_TOOL: &str = "nmap_advanced";

/// Nmap scan technique
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// TCP SYN (`-sS`)
    #[default]
    Syn,
    /// TCP connect (`-sT`)
    Connect,
    /// UDP (`-sU`)
    Udp,
    /// TCP NULL (`-sN`)
    Null,
}

impl ScanType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syn => "sS",
            Self::Connect => "sT",
            Self::Udp => "sU",
            Self::Null => "sN",
        }
    }

    pub fn flag(&self) -> String {
        format!("-{}", self.code())
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ScanType {
    type Err = ToolOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('-') {
            "sS" => Ok(Self::Syn),
            "sT" => Ok(Self::Connect),
            "sU" => Ok(Self::Udp),
            "sN" => Ok(Self::Null),
            _ => Err(ToolOptionError::Unknown {
                option: "scan_type",
                value: s.to_string(),
                expected: "sS, sT, sU, sN",
            }),
        }
    }
}

/// Nmap timing template (`-T0` .. `-T5`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timing {
    Paranoid,
    Sneaky,
    #[default]
    Polite,
    Normal,
    Aggressive,
    Insane,
}

impl Timing {
    pub fn level(&self) -> u8 {
        match self {
            Self::Paranoid => 0,
            Self::Sneaky => 1,
            Self::Polite => 2,
            Self::Normal => 3,
            Self::Aggressive => 4,
            Self::Insane => 5,
        }
    }

    pub fn flag(&self) -> String {
        format!("-T{}", self.level())
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.level())
    }
}

impl FromStr for Timing {
    type Err = ToolOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("-T").trim_start_matches('T') {
            "0" => Ok(Self::Paranoid),
            "1" => Ok(Self::Sneaky),
            "2" => Ok(Self::Polite),
            "3" => Ok(Self::Normal),
            "4" => Ok(Self::Aggressive),
            "5" => Ok(Self::Insane),
            _ => Err(ToolOptionError::Unknown {
                option: "timing",
                value: s.to_string(),
                expected: "0-5",
            }),
        }
    }
}

/// Stealth SYN scan of a port range at polite timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicScan {
    pub target: String,
    #[serde(default = "default_basic_ports")]
    pub ports: String,
}

fn default_basic_ports() -> String {
    "1-1000".to_string()
}

impl BasicScan {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ports: default_basic_ports(),
        }
    }

    pub fn ports(mut self, ports: impl Into<String>) -> Self {
        self.ports = ports.into();
        self
    }

    /// Resolve into a concrete request
    pub fn into_request(self, timeout: Duration) -> ExecutionRequest {
        ExecutionRequest::new(BASIC_TOOL, NMAP_BINARY, self.target, timeout)
            .args([ScanType::Syn.flag(), Timing::Polite.flag()])
            .arg("-p")
            .arg(self.ports)
    }
}

/// Fully configurable scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedScan {
    pub target: String,
    #[serde(default)]
    pub scan_type: ScanType,
    #[serde(default = "default_advanced_ports")]
    pub ports: String,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default = "default_true")]
    pub service_detection: bool,
    #[serde(default)]
    pub os_detection: bool,
    #[serde(default)]
    pub script_scan: bool,
}

fn default_advanced_ports() -> String {
    "1-65535".to_string()
}

fn default_true() -> bool {
    true
}

impl AdvancedScan {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_type: ScanType::default(),
            ports: default_advanced_ports(),
            timing: Timing::default(),
            service_detection: true,
            os_detection: false,
            script_scan: false,
        }
    }

    /// Resolve into a concrete request
    pub fn into_request(self, timeout: Duration) -> ExecutionRequest {
        let mut request = ExecutionRequest::new(ADVANCED_TOOL, NMAP_BINARY, self.target, timeout)
            .args([self.scan_type.flag(), self.timing.flag()])
            .arg("-p")
            .arg(self.ports);

        if self.service_detection {
            request = request.arg("-sV");
        }
        if self.os_detection {
            request = request.arg("-O");
        }
        if self.script_scan {
            request = request.arg("-sC");
        }

        request
    }
}

/// One line of the port table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEntry {
    pub port: String,
    pub state: String,
    pub service: String,
}

/// Pull `port state service` rows out of nmap's normal output
pub fn extract_ports(output: &str) -> Vec<PortEntry> {
    output
        .lines()
        .filter(|line| line.contains("/tcp") || line.contains("/udp"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let port = parts.next()?;
            let state = parts.next()?;
            let service = parts.next()?;
            Some(PortEntry {
                port: port.to_string(),
                state: state.to_string(),
                service: service.to_string(),
            })
        })
        .collect()
}
