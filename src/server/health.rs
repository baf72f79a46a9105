//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;
use crate::command::CommandRunner;
use crate::git::CheckoutState;
use crate::types::{RepoKind, Sha};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub stage: String,
    pub dry_run: bool,
    pub checkouts: CheckoutsHealth,
}

#[derive(Debug, Serialize)]
pub struct CheckoutsHealth {
    pub primary: CheckoutHealth,
    pub downstream: CheckoutHealth,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutHealth {
    Absent,
    Stale,
    Synced { head: Sha },
    /// Locked by a refresh or a running workflow.
    Busy,
}

impl From<Option<CheckoutState>> for CheckoutHealth {
    fn from(state: Option<CheckoutState>) -> Self {
        match state {
            None => CheckoutHealth::Busy,
            Some(CheckoutState::Absent) => CheckoutHealth::Absent,
            Some(CheckoutState::PresentStale) => CheckoutHealth::Stale,
            Some(CheckoutState::PresentSynced { head }) => CheckoutHealth::Synced { head },
        }
    }
}

/// `GET /health`: always 200 while the process is serving. Never waits on a
/// checkout lock.
pub async fn health_handler<R: CommandRunner>(State(state): State<AppState<R>>) -> Json<Health> {
    let engine = state.engine();
    let config = engine.config();
    let checkouts = engine.checkouts();
    Json(Health {
        status: "ok",
        stage: config.stage.to_string(),
        dry_run: config.dry_run,
        checkouts: CheckoutsHealth {
            primary: checkouts.state(RepoKind::Primary).into(),
            downstream: checkouts.state(RepoKind::Downstream).into(),
        },
    })
}
