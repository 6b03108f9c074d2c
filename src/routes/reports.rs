use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::user::AuthSession,
    entities::{
        prelude::{Agent, RegistrationRequest, Task},
        registration_request,
    },
    router::AppState,
    util::local_store::{REPORT_SUMMARY_KEY, Snapshot, report_snapshot_ttl},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportSummary {
    pub agents_total: u64,
    pub agents_by_role: BTreeMap<String, u64>,
    pub tasks_by_status: BTreeMap<String, u64>,
    pub pending_registrations: u64,
}

async fn compute_summary(db: &DatabaseConnection) -> Result<ReportSummary, DbErr> {
    let agents = Agent::find().all(db).await?;
    let mut agents_by_role = BTreeMap::new();
    for agent in &agents {
        *agents_by_role
            .entry(agent.role.as_str().to_owned())
            .or_insert(0u64) += 1;
    }

    let tasks = Task::find().all(db).await?;
    let mut tasks_by_status = BTreeMap::new();
    for task in &tasks {
        *tasks_by_status
            .entry(task.status.as_str().to_owned())
            .or_insert(0u64) += 1;
    }

    let pending_registrations = RegistrationRequest::find()
        .filter(registration_request::Column::Status.eq(registration_request::Status::Pending))
        .all(db)
        .await?
        .len() as u64;

    Ok(ReportSummary {
        agents_total: agents.len() as u64,
        agents_by_role,
        tasks_by_status,
        pending_registrations,
    })
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Admin report card. Served from the local-store snapshot while it is
/// fresh; recomputed otherwise. Failing to cache is not a request failure.
pub async fn summary(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(query): Query<SummaryQuery>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if !query.refresh {
        if let Some(snapshot) = state.store.get::<Snapshot<ReportSummary>>(REPORT_SUMMARY_KEY) {
            if snapshot.is_fresh(report_snapshot_ttl(), Utc::now()) {
                return Json(json!({
                    "cached": true,
                    "generated_at": snapshot.stored_at,
                    "summary": snapshot.value,
                }))
                .into_response();
            }
        }
    }

    let summary = match compute_summary(&state.db).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!(%err, "report computation failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to compute report summary",
            )
                .into_response();
        }
    };

    let snapshot = Snapshot::capture(summary);
    if let Err(err) = state.store.set(REPORT_SUMMARY_KEY, &snapshot) {
        tracing::warn!(%err, "failed to cache report snapshot");
    }

    Json(json!({
        "cached": false,
        "generated_at": snapshot.stored_at,
        "summary": snapshot.value,
    }))
    .into_response()
}
