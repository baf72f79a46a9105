//! GitHub webhook endpoint.
//!
//! Verifies the delivery's signature, then acts on `pull_request` events that
//! carry the deploy marker by bumping the downstream repository. The bump
//! runs before the response is sent, so GitHub's delivery log shows whether
//! it worked.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::{debug, info, warn};

use super::AppState;
use super::response::{ApiError, reject, respond};
use crate::command::CommandRunner;
use crate::webhooks::{ActionDecision, classify, parse_pull_request};
use crate::workflows::ActionOutcome;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// HMAC-SHA256 signature header. Preferred when present.
const HEADER_SIGNATURE_256: &str = "x-hub-signature-256";
/// Legacy HMAC-SHA1 signature header.
const HEADER_SIGNATURE: &str = "x-hub-signature";

pub const UNSUPPORTED_EVENT_REASON: &str = "Unsupported event type.";

/// Webhook handler.
///
/// # Response
///
/// - 200: processed, possibly as a no-op (`reason` says which)
/// - 400: the payload is not JSON, or the bump failed
/// - 403: the signature did not verify
pub async fn webhook_handler<R: CommandRunner>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = header(&headers, HEADER_DELIVERY).unwrap_or("-");
    let event_type = header(&headers, HEADER_EVENT).unwrap_or_default();
    debug!(%delivery, %event_type, "Received webhook");

    // Verify before looking at the payload at all.
    let signature =
        header(&headers, HEADER_SIGNATURE_256).or_else(|| header(&headers, HEADER_SIGNATURE));
    if let Err(e) = state.webhook_policy().check(&body, signature) {
        warn!(%delivery, error = %e, "Rejected webhook signature");
        return reject(state.reporter(), ApiError::InvalidSignature(e));
    }

    if event_type != "pull_request" {
        return respond(
            state.reporter(),
            ActionOutcome::succeeded(UNSUPPORTED_EVENT_REASON),
            StatusCode::OK,
        );
    }

    let event = match parse_pull_request(&body) {
        Ok(event) => event,
        Err(e) => return reject(state.reporter(), e.into()),
    };

    match classify(&event, state.classify_policy()) {
        ActionDecision::Ignore(reason) => {
            info!(%delivery, action = %event.action, %reason, "Ignoring pull request event");
            respond(
                state.reporter(),
                ActionOutcome::succeeded(reason.message()),
                StatusCode::OK,
            )
        }
        ActionDecision::Proceed {
            head_sha,
            head_branch,
        } => {
            let outcome = state
                .engine()
                .bump_version(&head_branch, &head_sha, event.head_commit_author.as_ref())
                .await;
            // Only turn the hook red when the bump actually failed.
            let status = if outcome.updated {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            respond(state.reporter(), outcome.into(), status)
        }
    }
}

/// A header's value, if present and valid UTF-8.
pub(super) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
