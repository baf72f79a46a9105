//! HTTP server.
//!
//! # Endpoints
//!
//! - `POST /` and `POST /webhook` - GitHub webhook deliveries
//! - `POST /api/revert` - Revert a commit in one of the two repositories
//! - `GET /health` - Returns 200 while the server is running
//!
//! Handlers answer with `{"reason": ...}` and a status: 200 when the request
//! was processed (possibly as a no-op), 403 for a bad signature, 400 when
//! the request was bad or the work failed.

use std::sync::Arc;

pub mod health;
pub mod response;
pub mod revert;
pub mod webhook;

pub use health::health_handler;
pub use response::{ApiError, reject, respond};
pub use revert::revert_handler;
pub use webhook::webhook_handler;

use crate::command::CommandRunner;
use crate::report::ErrorReporter;
use crate::webhooks::{ClassifyPolicy, SignaturePolicy};
use crate::workflows::Engine;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<R> {
    inner: Arc<AppStateInner<R>>,
}

struct AppStateInner<R> {
    engine: Engine<R>,
    reporter: Arc<dyn ErrorReporter>,
    webhook_policy: SignaturePolicy,
    api_policy: SignaturePolicy,
    classify_policy: ClassifyPolicy,
}

// Manual impl: deriving would demand `R: Clone`.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: CommandRunner> AppState<R> {
    pub fn new(engine: Engine<R>, reporter: Arc<dyn ErrorReporter>) -> Self {
        let config = engine.config();
        let webhook_policy = SignaturePolicy::for_secret(&config.webhook_secret);
        let api_policy = SignaturePolicy::for_secret(&config.api_secret);
        let classify_policy = ClassifyPolicy::from_config(config);
        AppState {
            inner: Arc::new(AppStateInner {
                engine,
                reporter,
                webhook_policy,
                api_policy,
                classify_policy,
            }),
        }
    }

    pub fn engine(&self) -> &Engine<R> {
        &self.inner.engine
    }

    pub fn reporter(&self) -> &dyn ErrorReporter {
        self.inner.reporter.as_ref()
    }

    pub fn webhook_policy(&self) -> &SignaturePolicy {
        &self.inner.webhook_policy
    }

    pub fn api_policy(&self) -> &SignaturePolicy {
        &self.inner.api_policy
    }

    pub fn classify_policy(&self) -> &ClassifyPolicy {
        &self.inner.classify_policy
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<R: CommandRunner>(app_state: AppState<R>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler::<R>))
        .route("/webhook", post(webhook_handler::<R>))
        .route("/api/revert", post(revert_handler::<R>))
        .route("/health", get(health_handler::<R>))
        .with_state(app_state)
}
