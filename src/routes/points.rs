use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::user::AuthSession,
    ops::{
        activity::{self, ActivityError},
        points::{PointSetting, PointSettings, agent_points_summary},
    },
    router::AppState,
    util::local_store::POINT_SETTINGS_KEY,
};

#[derive(Deserialize)]
pub struct PointsQuery {
    pub mobile: String,
}

/// Points card: lifetime, current-month and trailing-week totals for the
/// agent behind a mobile number.
pub async fn check(State(state): State<AppState>, Query(query): Query<PointsQuery>) -> Response {
    if query.mobile.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Please enter a mobile number").into_response();
    }

    let profile = match activity::find_agent_by_mobile(&state.db, &query.mobile).await {
        Ok(profile) => profile,
        Err(ActivityError::AgentNotFound) => {
            return (
                StatusCode::NOT_FOUND,
                "Agent not found with this mobile number",
            )
                .into_response();
        }
        Err(err) => {
            tracing::error!(%err, "agent lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch points data",
            )
                .into_response();
        }
    };

    let settings = state.points.read().unwrap().clone();
    match agent_points_summary(
        &state.db,
        profile.agent.id,
        profile.agent.role,
        &settings,
        Utc::now().date_naive(),
    )
    .await
    {
        Ok(summary) => Json(json!({
            "agent": profile.agent,
            "panchayath": profile.panchayath,
            "points": summary,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(%err, "points computation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch points data",
            )
                .into_response()
        }
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Vec<PointSetting>> {
    Json(state.points.read().unwrap().to_rows())
}

/// Replaces the points table, both in memory and in the local store. Takes
/// effect for future computations only; past totals are never rewritten.
pub async fn put_settings(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(rows): Json<Vec<PointSetting>>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let settings = PointSettings::from_rows(rows);
    let rows = settings.to_rows();
    if let Err(err) = state.store.set(POINT_SETTINGS_KEY, &rows) {
        tracing::error!(%err, "failed to persist point settings");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save point settings",
        )
            .into_response();
    }
    *state.points.write().unwrap() = settings;

    Json(rows).into_response()
}
