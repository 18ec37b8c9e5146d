use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::CheckResult;
use crate::inspector::NfsInspector;

#[derive(Debug, Serialize)]
pub struct ShareReport {
    pub server: String,
    pub checked_at: DateTime<Utc>,
    pub requested: Vec<String>,
    /// Requested shares absent from the export list, sorted.
    pub result: CheckResult<Vec<String>>,
}

/// Splits the comma-separated share argument. Entries are not trimmed;
/// empty entries (e.g. from a trailing comma) are dropped.
pub fn parse_requested(shares: &str) -> BTreeSet<String> {
    shares
        .split(',')
        .filter(|share| !share.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn missing_shares(requested: &BTreeSet<String>, available: &BTreeSet<String>) -> Vec<String> {
    requested.difference(available).cloned().collect()
}

pub fn check_shares(inspector: &dyn NfsInspector, server: &str, shares: &str) -> ShareReport {
    let requested = parse_requested(shares);

    let result = match inspector.exported_shares(server) {
        Ok(available) => {
            let missing = missing_shares(&requested, &available);
            if missing.is_empty() {
                tracing::info!(server, count = requested.len(), "all requested shares exported");
            } else {
                tracing::info!(server, missing = ?missing, "requested shares not exported");
            }
            CheckResult::success(missing)
        }
        Err(e) => {
            tracing::error!(server, error = %e, "NFS share check failed");
            CheckResult::failure(e.to_string())
        }
    };

    ShareReport {
        server: server.to_string(),
        checked_at: Utc::now(),
        requested: requested.into_iter().collect(),
        result,
    }
}

/// Empty when every share is exported, otherwise the missing shares as a
/// JSON array.
pub fn format_share_human(report: &ShareReport) -> String {
    report.result.format_human(|missing| {
        if missing.is_empty() {
            String::new()
        } else {
            serde_json::to_string(missing).unwrap_or_default()
        }
    })
}
