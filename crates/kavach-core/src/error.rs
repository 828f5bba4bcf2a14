//! Error types for the KAVACH core.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for core operations
pub type KavachResult<T> = Result<T, KavachError>;

/// Longest raw payload fragment carried inside a [`ContractViolation`].
const FRAGMENT_LIMIT: usize = 200;

/// Inference output failed the declared output schema.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("contract violation at `{field}`: {reason} (payload: {fragment})")]
pub struct ContractViolation {
    /// Dotted path of the offending field (`$` for the payload itself).
    pub field: String,
    pub reason: String,
    /// Truncated fragment of the raw payload that failed.
    pub fragment: String,
}

impl ContractViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>, fragment: &str) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            fragment: truncate(fragment),
        }
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= FRAGMENT_LIMIT {
        return s.to_string();
    }
    let mut out: String = s.chars().take(FRAGMENT_LIMIT).collect();
    out.push('…');
    out
}

/// Failures reported by (or on behalf of) the external inference capability.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("inference transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference service returned {0}: {1}")]
    Status(u16, String),

    #[error("inference refused: {0}")]
    Refused(String),

    #[error("inference returned no content")]
    EmptyResponse,

    #[error("inference configuration error: {0}")]
    Config(String),

    #[error("scripted gateway exhausted")]
    Exhausted,
}

/// Why a forensic analysis or honeypot turn could not produce a result.
#[derive(Error, Debug)]
pub enum FailureCause {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Errors surfaced by core operations
#[derive(Error, Debug)]
pub enum KavachError {
    #[error("voice analysis failed: {0}")]
    AnalysisFailed(FailureCause),

    #[error("honeypot engagement failed: {0}")]
    EngagementFailed(FailureCause),

    #[error("session {0} already has a turn in flight")]
    SessionConflict(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl KavachError {
    /// Stable machine-readable label, used by the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            KavachError::AnalysisFailed(_) => "analysis_failed",
            KavachError::EngagementFailed(_) => "engagement_failed",
            KavachError::SessionConflict(_) => "session_conflict",
            KavachError::UnknownSession(_) => "unknown_session",
            KavachError::InvalidRequest(_) => "invalid_request",
            KavachError::Config(_) => "config",
        }
    }

    /// The underlying cause for operation-level failures.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            KavachError::AnalysisFailed(c) | KavachError::EngagementFailed(c) => Some(c),
            _ => None,
        }
    }
}
