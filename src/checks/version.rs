use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CheckResult;
use crate::inspector::NfsInspector;

#[derive(Debug, Serialize)]
pub struct VersionReport {
    pub server: String,
    pub checked_at: DateTime<Utc>,
    /// Highest advertised NFS version; 0 when the service is not registered.
    pub result: CheckResult<u32>,
}

pub fn check_version(inspector: &dyn NfsInspector, server: &str) -> VersionReport {
    let result = match inspector.advertised_versions(server) {
        Ok(versions) => {
            let highest = versions.into_iter().max().unwrap_or(0);
            if highest == 0 {
                tracing::info!(server, "no NFS version advertised");
            } else {
                tracing::info!(server, version = highest, "highest NFS version");
            }
            CheckResult::success(highest)
        }
        Err(e) => {
            tracing::error!(server, error = %e, "NFS version check failed");
            CheckResult::failure(e.to_string())
        }
    };

    VersionReport {
        server: server.to_string(),
        checked_at: Utc::now(),
        result,
    }
}

pub fn format_version_human(report: &VersionReport) -> String {
    report.result.format_human(|version| version.to_string())
}
