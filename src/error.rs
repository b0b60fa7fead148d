//! Error types for SpaceOdT.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, template inputs, the Webex API, planning and background jobs.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for SpaceOdT.
#[derive(Debug, Error)]
pub enum SpaceOdtError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input template errors.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Webex API errors.
    #[error("Webex API error: {0}")]
    Webex(#[from] WebexError),

    /// Planning and execution errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Background job errors.
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token in the environment.
    #[error(
        "Missing Webex token. Set WEBEX_ACCESS_TOKEN (or WEBEX_TOKEN) before running this command."
    )]
    MissingToken,

    /// The settings file could not be read or parsed.
    #[error("Failed to parse settings: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A value failed validation.
    #[error("Invalid value for {field}: {message}")]
    Invalid {
        /// Offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while loading input templates.
#[derive(Debug, Error)]
pub enum InputError {
    /// Missing templates were generated and must be filled in.
    #[error(
        "Required input templates were created. Fill them in and retry:\n{}",
        list_paths(.created)
    )]
    TemplatesCreated {
        /// Paths of the generated templates.
        created: Vec<PathBuf>,
    },

    /// A row failed validation.
    #[error("Invalid row {row} in {source_name}: {message}")]
    InvalidRow {
        /// File or upload the row came from.
        source_name: String,
        /// 1-based row number (header = 1).
        row: usize,
        /// Description of the problem.
        message: String,
    },

    /// The policy document is malformed.
    #[error("Invalid static policy: {message}")]
    InvalidPolicy {
        /// Description of the problem.
        message: String,
    },

    /// Upload payload could not be understood.
    #[error("Unsupported upload: {message}")]
    UnsupportedUpload {
        /// Description of the problem.
        message: String,
    },
}

/// Webex API errors.
#[derive(Debug, Error)]
pub enum WebexError {
    /// Authentication failed.
    #[error("Webex authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The token lacks permission for the resource.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message from API.
        message: String,
    },

    /// The resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Error message from API.
        message: String,
    },

    /// Rate limited (HTTP 429).
    #[error("Webex API rate limited (retry after: {})", format_retry_after(.retry_after))]
    RateLimited {
        /// Server supplied `Retry-After`, if any.
        retry_after: Option<Duration>,
    },

    /// API request failed.
    #[error("Webex API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with Webex: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Webex API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The requested setting is not available for this kind of entity.
    #[error("Setting {setting} is not supported for {target}")]
    UnsupportedSetting {
        /// Setting name.
        setting: String,
        /// Target kind.
        target: String,
    },
}

/// Planning and execution errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Action index outside of the current plan.
    #[error("action_id out of range: {action_id} (plan has {len} actions)")]
    ActionOutOfRange {
        /// Requested index.
        action_id: usize,
        /// Plan length.
        len: usize,
    },

    /// A referenced entity could not be resolved.
    #[error("{kind} not found: {reference}")]
    Unresolved {
        /// Entity kind.
        kind: &'static str,
        /// Name or identifier that was looked up.
        reference: String,
    },

    /// The outgoing profile is neither in the policy nor inline.
    #[error("Outgoing profile not found in static_policy.json: {profile}")]
    OutgoingProfileNotFound {
        /// Requested profile.
        profile: String,
    },

    /// A stage decision could not be parsed.
    #[error("Invalid stage decision '{input}': expected yes, no or 'yesbut <overrides.csv>'")]
    InvalidDecision {
        /// Raw operator input.
        input: String,
    },

    /// A required parameter is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },
}

/// Background job errors.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job does not exist.
    #[error("job not found: {job_id}")]
    NotFound {
        /// Requested job.
        job_id: String,
    },

    /// The job has no results yet.
    #[error("job result not available: {job_id}")]
    ResultNotAvailable {
        /// Requested job.
        job_id: String,
    },

    /// The job is not running.
    #[error("job is not running: {job_id}")]
    NotRunning {
        /// Requested job.
        job_id: String,
    },
}

/// Result type alias for SpaceOdT operations.
pub type Result<T> = std::result::Result<T, SpaceOdtError>;

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_retry_after(retry_after: &Option<Duration>) -> String {
    retry_after.map_or_else(|| String::from("unspecified"), |d| format!("{}s", d.as_secs_f64()))
}

impl SpaceOdtError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Webex(WebexError::RateLimited { retry_after: Some(_) })
        )
    }

    /// Returns the server supplied retry delay, if any.
    #[must_use]
    pub const fn retry_delay(&self) -> Option<Duration> {
        match self {
            Self::Webex(WebexError::RateLimited { retry_after }) => *retry_after,
            _ => None,
        }
    }

    /// HTTP status carried by the error, if it came from the API.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Webex(err) => err.status(),
            _ => None,
        }
    }

    /// Short name of the error category.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Input(_) => "input",
            Self::Webex(_) => "webex",
            Self::Plan(_) => "plan",
            Self::Job(_) => "job",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Csv(_) => "csv",
            Self::Internal(_) => "internal",
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(ConfigError::MissingToken) => 2,
            _ => 1,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl WebexError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Builds the error for a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            401 => Self::AuthenticationFailed { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            429 => Self::RateLimited { retry_after },
            _ => Self::api_error(status, message),
        }
    }

    /// HTTP status this error represents.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::ApiRequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl PlanError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_exit_code_and_message() {
        let err = SpaceOdtError::from(ConfigError::MissingToken);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Missing Webex token"));
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            WebexError::from_status(403, "nope", None),
            WebexError::Forbidden { .. }
        ));
        assert!(matches!(
            WebexError::from_status(404, "gone", None),
            WebexError::NotFound { .. }
        ));
        assert_eq!(WebexError::from_status(500, "boom", None).status(), Some(500));
    }

    #[test]
    fn test_only_rate_limit_with_header_is_retryable() {
        let with_header = SpaceOdtError::from(WebexError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        });
        let without_header = SpaceOdtError::from(WebexError::RateLimited { retry_after: None });

        assert!(with_header.is_retryable());
        assert_eq!(with_header.retry_delay(), Some(Duration::from_secs(2)));
        assert!(!without_header.is_retryable());
    }

    #[test]
    fn test_templates_created_lists_paths() {
        let err = InputError::TemplatesCreated {
            created: vec![PathBuf::from("out/v21/input_locations.csv")],
        };
        assert!(err.to_string().contains("  - out/v21/input_locations.csv"));
    }
}
