//! Error-reporting sink.
//!
//! Responses that signal a real failure are forwarded to an
//! [`ErrorReporter`] in addition to being logged. The process ships with
//! [`TracingReporter`], which emits them as `error!` events tagged
//! `reported = true` so a log-based alerting pipeline can pick them up.

use std::fmt;

use tracing::{error, warn};

/// How bad a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Receives failures worth a human's attention.
pub trait ErrorReporter: Send + Sync {
    fn capture_message(&self, message: &str, severity: Severity);

    fn capture_error(&self, error: &(dyn std::error::Error + 'static));
}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn capture_message(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Warning => warn!(reported = true, %severity, "{message}"),
            Severity::Error | Severity::Fatal => error!(reported = true, %severity, "{message}"),
        }
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        error!(reported = true, chain = %error_chain(error), "{error}");
    }
}

/// Renders an error and all of its sources as `outer: inner: root`.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        // thiserror messages often already embed their source.
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}
