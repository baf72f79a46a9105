//! Turning outcomes and errors into HTTP responses.
//!
//! Every response body is `{"reason": ...}` (plus `revert_sha` after a
//! revert). Every response is logged; anything other than 200 or 403 is also
//! forwarded to the error reporter, at a severity that depends on whose fault
//! it was.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{info, warn};

use crate::report::{ErrorReporter, Severity};
use crate::webhooks::{AuthenticationError, ParseError};
use crate::workflows::{ActionOutcome, RevertError};

/// Reason sent for any signature failure.
pub const INVALID_SIGNATURE_REASON: &str = "Cannot validate payload signature.";
/// Reason sent when a revert fails while running.
pub const REVERT_FAILED_REASON: &str = "Failed to revert.";

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] AuthenticationError),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] ParseError),

    #[error("malformed revert request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Revert(#[from] RevertError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidSignature(_) => StatusCode::FORBIDDEN,
            ApiError::MalformedPayload(_)
            | ApiError::MalformedRequest(_)
            | ApiError::Revert(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The reason shown to the caller. Failures while running git get a
    /// generic message; the details go to the reporter.
    pub fn reason(&self) -> String {
        match self {
            ApiError::InvalidSignature(_) => INVALID_SIGNATURE_REASON.to_string(),
            ApiError::Revert(e) if !e.is_caller_error() => REVERT_FAILED_REASON.to_string(),
            other => other.to_string(),
        }
    }

    /// How the reporter hears about this error. Signature failures are not
    /// reported; bad requests are warnings; faults while running are errors.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            ApiError::InvalidSignature(_) => None,
            ApiError::Revert(e) if !e.is_caller_error() => Some(Severity::Error),
            _ => Some(Severity::Warning),
        }
    }

    /// The underlying failure, when it is an operational fault rather than a
    /// bad request.
    fn fault(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Revert(e) if !e.is_caller_error() => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ActionOutcome::failed(self.reason());
        (self.status(), Json(body)).into_response()
    }
}

/// Logs `outcome`, reports it as fatal if `status` signals a failure, and
/// renders it.
pub fn respond(reporter: &dyn ErrorReporter, outcome: ActionOutcome, status: StatusCode) -> Response {
    let severity = (status != StatusCode::OK && status != StatusCode::FORBIDDEN)
        .then_some(Severity::Fatal);
    render(reporter, outcome, status, severity)
}

/// Logs and reports `error` at its own severity, then renders it.
pub fn reject(reporter: &dyn ErrorReporter, error: ApiError) -> Response {
    warn!(error = %error, "Request failed");
    if let Some(fault) = error.fault() {
        reporter.capture_error(fault);
    }
    render(
        reporter,
        ActionOutcome::failed(error.reason()),
        error.status(),
        error.severity(),
    )
}

fn render(
    reporter: &dyn ErrorReporter,
    outcome: ActionOutcome,
    status: StatusCode,
    severity: Option<Severity>,
) -> Response {
    info!(status = status.as_u16(), reason = %outcome.reason, "Responding");
    if let Some(severity) = severity {
        reporter.capture_message(&outcome.reason, severity);
    }
    (status, Json(outcome)).into_response()
}
