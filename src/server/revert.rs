//! Revert API endpoint.
//!
//! `POST /api/revert` with a JSON body `{"repo", "sha", "name"}`, signed with
//! the API secret in `X-Signature` (HMAC-SHA1, `sha1=` prefix optional).

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::{info, warn};

use super::AppState;
use super::response::{ApiError, reject, respond};
use super::webhook::header;
use crate::command::CommandRunner;
use crate::workflows::RevertRequest;

const HEADER_SIGNATURE: &str = "x-signature";

pub async fn revert_handler<R: CommandRunner>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = state
        .api_policy()
        .check(&body, header(&headers, HEADER_SIGNATURE))
    {
        warn!(error = %e, "Rejected revert request signature");
        return reject(state.reporter(), ApiError::InvalidSignature(e));
    }

    let request: RevertRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return reject(state.reporter(), ApiError::MalformedRequest(e)),
    };
    info!(
        requester = %request.name,
        sha = %request.sha,
        repo = %request.repo,
        "{} has requested to revert {} from {}",
        request.name,
        request.sha,
        request.repo
    );

    match state.engine().revert_commit(&request).await {
        Ok(outcome) => respond(state.reporter(), outcome, StatusCode::OK),
        Err(e) => reject(state.reporter(), e.into()),
    }
}
