//! Result structs for check output. Checks return these instead of printing
//! directly; main.rs renders them as a single line or as JSON.
mod share;
mod version;

pub use share::*;
pub use version::*;

use serde::Serialize;

/// Outcome of one check. `ok` is false exactly when the check could not be
/// carried out; a check that ran but found nothing is still `ok`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult<T> {
    pub ok: bool,
    pub value: Option<T>,
    pub error: Option<String>,
}

impl<T> CheckResult<T> {
    pub fn success(value: T) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error: Some(error.into()),
        }
    }

    /// Renders the result for the plain-text output line.
    pub fn format_human(&self, value_fn: impl FnOnce(&T) -> String) -> String {
        match (&self.value, &self.error) {
            (Some(value), _) if self.ok => value_fn(value),
            (_, Some(error)) => format!("Error: {}", error),
            _ => "Error: check produced no result".to_string(),
        }
    }
}
