//! Command-line interface for reconbridge.
//!
//! Provides commands for running scans, reviewing the audit history and
//! showing the resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};

use crate::config::{self, ResolvedConfig};
use crate::core::{Orchestrator, ScanOutcome};
use crate::tools::{tool_names, AdvancedScan, BasicScan, ScanType, Timing, ToolInvocation};

pub mod report;

/// reconbridge - Audited execution bridge for reconnaissance tools
#[derive(Parser, Debug)]
#[command(name = "reconbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audit database file (overrides SCAN_DB_PATH and config file)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Artifact directory (overrides RESULTS_PATH and config file)
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Print structured JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scan
    Scan {
        #[command(subcommand)]
        profile: ScanProfile,
    },

    /// Show recent scan history, newest first
    History {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only show records for this tool
        #[arg(short, long, value_parser = PossibleValuesParser::new(tool_names()))]
        tool: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum ScanProfile {
    /// Stealth SYN scan of a port range
    Basic {
        /// IP address or hostname to scan
        target: String,

        /// Port range to scan
        #[arg(short, long, default_value = "1-1000")]
        ports: String,
    },

    /// Scan with full option control
    Advanced(AdvancedArgs),
}

#[derive(Args, Debug)]
pub struct AdvancedArgs {
    /// IP address or hostname to scan
    target: String,

    /// Scan type (sS=SYN, sT=TCP connect, sU=UDP, sN=NULL)
    #[arg(long, default_value = "sS")]
    scan_type: ScanType,

    /// Port range to scan
    #[arg(short, long, default_value = "1-65535")]
    ports: String,

    /// Timing template (0-5, 2=polite)
    #[arg(long, default_value = "2")]
    timing: Timing,

    /// Disable service/version detection
    #[arg(long)]
    no_service_detection: bool,

    /// Enable OS detection (requires root)
    #[arg(long)]
    os_detection: bool,

    /// Enable default NSE scripts
    #[arg(long)]
    script_scan: bool,
}

impl From<ScanProfile> for ToolInvocation {
    fn from(profile: ScanProfile) -> Self {
        match profile {
            ScanProfile::Basic { target, ports } => {
                ToolInvocation::NmapBasic(BasicScan::new(target).ports(ports))
            }
            ScanProfile::Advanced(args) => ToolInvocation::NmapAdvanced(AdvancedScan {
                target: args.target,
                scan_type: args.scan_type,
                ports: args.ports,
                timing: args.timing,
                service_detection: !args.no_service_detection,
                os_detection: args.os_detection,
                script_scan: args.script_scan,
            }),
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::config()?
            .clone()
            .with_overrides(self.db_path, self.results_dir);

        match self.command {
            Commands::Scan { profile } => run_scan(&config, profile.into(), self.json).await,
            Commands::History { limit, tool } => {
                show_history(&config, limit, tool.as_deref(), self.json).await
            }
            Commands::Config => show_config(&config),
        }
    }
}

/// Run one tool invocation and print its report
async fn run_scan(config: &ResolvedConfig, invocation: ToolInvocation, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::open(config).await?;
    let request = invocation.into_request(&config.scans);

    let outcome: ScanOutcome = match orchestrator.run(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("❌ Rejected: {}", e);
            std::process::exit(2);
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize scan outcome")?
        );
    } else {
        print!("{}", report::scan_report(&outcome));
    }

    if !outcome.result.succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Print recent audit records
async fn show_history(
    config: &ResolvedConfig,
    limit: usize,
    tool: Option<&str>,
    json: bool,
) -> Result<()> {
    let orchestrator = Orchestrator::open(config).await?;
    let records = orchestrator.history(limit, tool).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialize history")?
        );
    } else {
        print!("{}", report::history_report(&records));
    }
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("reconbridge configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:           {}", cfg.home.display());
    println!("  Audit database: {}", cfg.db_path.display());
    println!("  Results:        {}", cfg.results_dir.display());
    println!();
    println!("Scans:");
    println!("  Basic timeout:    {}s", cfg.scans.basic_timeout_seconds);
    println!("  Advanced timeout: {}s", cfg.scans.advanced_timeout_seconds);
    println!();
    println!("Artifacts:");
    println!("  Policy: {:?}", cfg.artifacts.policy);
    println!();
    println!("Tools: {}", tool_names().join(", "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_scan() {
        let cli = Cli::try_parse_from(["reconbridge", "scan", "basic", "10.0.0.1", "-p", "22"]).unwrap();
        match cli.command {
            Commands::Scan { profile } => {
                let invocation: ToolInvocation = profile.into();
                assert_eq!(
                    invocation,
                    ToolInvocation::NmapBasic(BasicScan::new("10.0.0.1").ports("22"))
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_advanced_scan() {
        let cli = Cli::try_parse_from([
            "reconbridge",
            "scan",
            "advanced",
            "10.0.0.1",
            "--scan-type",
            "sU",
            "--timing",
            "4",
            "--no-service-detection",
            "--os-detection",
        ])
        .unwrap();

        let Commands::Scan { profile } = cli.command else {
            panic!("expected scan command");
        };
        match ToolInvocation::from(profile) {
            ToolInvocation::NmapAdvanced(scan) => {
                assert_eq!(scan.scan_type, ScanType::Udp);
                assert_eq!(scan.timing, Timing::Aggressive);
                assert!(!scan.service_detection);
                assert!(scan.os_detection);
                assert!(!scan.script_scan);
            }
            other => panic!("unexpected invocation: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_scan_type_is_a_parse_error() {
        let result = Cli::try_parse_from([
            "reconbridge",
            "scan",
            "advanced",
            "10.0.0.1",
            "--scan-type",
            "sX",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_history_tool_filter_is_limited_to_catalogue() {
        let result = Cli::try_parse_from(["reconbridge", "history", "--tool", "masscan"]);
        assert!(result.is_err());

        for tool in tool_names() {
            assert!(Cli::try_parse_from(["reconbridge", "history", "--tool", tool]).is_ok());
        }
    }

    #[test]
    fn test_parse_history_with_global_flags() {
        let cli = Cli::try_parse_from([
            "reconbridge",
            "history",
            "--limit",
            "5",
            "--tool",
            "nmap_basic",
            "--json",
            "--db-path",
            "/tmp/x.db",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Commands::History { limit, tool } => {
                assert_eq!(limit, 5);
                assert_eq!(tool.as_deref(), Some("nmap_basic"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
