//! Per-module export status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SpaceOdtError;

/// Outcome of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleResult {
    /// Exported.
    Ok,
    /// Failed for another reason.
    Error,
    /// The token may not read this collection.
    Forbidden,
    /// The endpoint does not exist for this org.
    NotFound,
}

impl ModuleResult {
    /// Classifies an export failure by HTTP status.
    #[must_use]
    pub const fn classify(err: &SpaceOdtError) -> Self {
        match err.http_status() {
            Some(403) => Self::Forbidden,
            Some(404) => Self::NotFound,
            _ => Self::Error,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ModuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of `status.json` / `status.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Module name.
    pub module: String,
    /// Endpoint that was listed.
    pub method: String,
    /// Outcome.
    pub result: ModuleResult,
    /// HTTP status of the failure.
    pub http_status: Option<u16>,
    /// Error text, empty on success.
    pub error: String,
    /// Exported rows.
    pub count: usize,
    /// Time spent, in milliseconds.
    pub elapsed_ms: u64,
}

impl StatusRecord {
    /// Columns of `status.csv`.
    pub const COLUMNS: [&'static str; 7] = [
        "module",
        "method",
        "result",
        "http_status",
        "error",
        "count",
        "elapsed_ms",
    ];
}
