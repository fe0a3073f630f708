//! Text reports for scan outcomes and audit history.

use std::fmt::Write;

use crate::core::{AuditOutcome, ScanOutcome};
use crate::domain::AuditRecord;
use crate::tools::extract_ports;

const RULE_WIDTH: usize = 50;

/// Human-readable report for one scan
pub fn scan_report(outcome: &ScanOutcome) -> String {
    let mut out = String::new();
    let result = &outcome.result;

    if result.succeeded {
        let _ = writeln!(out, "✅ {} complete", outcome.request.tool);
        let _ = writeln!(out, "Target: {}", outcome.request.target);
        let _ = writeln!(out, "Command: {}", outcome.command);
        let _ = writeln!(out);

        let ports = extract_ports(&result.stdout);
        let _ = writeln!(out, "📊 Ports ({}):", ports.len());
        for port in &ports {
            let _ = writeln!(out, "  {:<12} {:<16} {}", port.port, port.state, port.service);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "📝 Raw Output:");
        let _ = writeln!(out, "{}", result.stdout.trim_end());
    } else {
        let reason = if result.stderr.trim().is_empty() {
            format!("exit status {}", result.exit_status)
        } else {
            result.stderr.trim().to_string()
        };
        let _ = writeln!(out, "❌ Scan failed: {}", reason);
    }

    let _ = writeln!(out);
    match outcome.artifact_reference() {
        Some(path) => {
            let _ = writeln!(out, "💾 Saved to: {}", path);
        }
        None => {
            if let Some(ref e) = outcome.artifact_error {
                let _ = writeln!(out, "⚠️  Output not saved: {}", e);
            }
        }
    }

    match &outcome.audit {
        AuditOutcome::Recorded(id) => {
            let _ = writeln!(out, "🗂  Audit record #{}", id);
        }
        AuditOutcome::Impaired(e) => {
            let _ = writeln!(out, "⚠️  WARNING: audit trail impaired, scan was not recorded: {}", e);
        }
    }

    out
}

/// Human-readable listing of audit records
pub fn history_report(records: &[AuditRecord]) -> String {
    if records.is_empty() {
        return "No scan history found.\n".to_string();
    }

    let rule = "-".repeat(RULE_WIDTH);
    let mut out = format!("📊 Scan History\n{}\n\n", "=".repeat(RULE_WIDTH));
    for record in records {
        let _ = writeln!(out, "#{}", record.id);
        let _ = writeln!(out, "Timestamp: {}", record.timestamp.to_rfc3339());
        let _ = writeln!(out, "Tool: {}", record.tool);
        let _ = writeln!(out, "Target: {}", record.target);
        let _ = writeln!(out, "Command: {}", record.command);
        let _ = writeln!(out, "Status: {}", record.status);
        let _ = writeln!(
            out,
            "Result File: {}",
            record.artifact.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "{}", rule);
    }
    out
}
