use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    changes::ChangeKind,
    entities::prelude::Agent,
    ops::activity::{self, ActivityError, RecordOutcome, classify_date},
    router::AppState,
};
use sea_orm::EntityTrait;

#[derive(Deserialize)]
pub struct MobileRequest {
    pub mobile: String,
}

/// Mobile lookup for the activity log. The leave backfill runs here as a
/// best-effort side effect; its failure never blocks the lookup response.
pub async fn lookup(State(state): State<AppState>, Json(req): Json<MobileRequest>) -> Response {
    if req.mobile.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Please enter a mobile number").into_response();
    }

    let profile = match activity::find_agent_by_mobile(&state.db, &req.mobile).await {
        Ok(profile) => profile,
        Err(ActivityError::AgentNotFound) => {
            return (
                StatusCode::NOT_FOUND,
                format!("No agent found with mobile number: {}", req.mobile.trim()),
            )
                .into_response();
        }
        Err(err) => {
            tracing::error!(%err, "agent lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to find agent").into_response();
        }
    };

    let today = Utc::now().date_naive();
    match activity::ensure_leave_for_yesterday(&state.db, &profile.agent, today).await {
        Ok(Some(leave)) => {
            state
                .feed
                .publish("daily_activities", ChangeKind::Insert, &leave);
        }
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(agent = %profile.agent.id, %err, "leave backfill failed");
        }
    }

    match activity::list_activities(&state.db, profile.agent.id).await {
        Ok(activities) => Json(json!({
            "agent": profile.agent,
            "panchayath": profile.panchayath,
            "is_team_member": profile.is_team_member,
            "activities": activities,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(%err, "failed to fetch activities");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch activities",
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RecordRequest {
    pub agent_id: Uuid,
    pub date: Option<NaiveDate>,
    pub description: String,
}

pub async fn record(State(state): State<AppState>, Json(req): Json<RecordRequest>) -> Response {
    let agent = match Agent::find_by_id(req.agent_id).one(&state.db).await {
        Ok(Some(agent)) => agent,
        Ok(None) => return (StatusCode::NOT_FOUND, "Agent not found").into_response(),
        Err(err) => {
            tracing::error!(%err, "agent fetch failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save activity").into_response();
        }
    };

    let settings = state.points.read().unwrap().clone();
    let today = Utc::now().date_naive();
    let date = req.date.unwrap_or(today);

    match activity::record_activity(&state.db, &agent, date, &req.description, &settings, today)
        .await
    {
        Ok(RecordOutcome::Logged {
            activity,
            points_earned,
            monthly_total,
            monthly_activities,
        }) => {
            state
                .feed
                .publish("daily_activities", ChangeKind::Insert, &activity);
            (
                StatusCode::CREATED,
                Json(json!({
                    "status": "logged",
                    "activity": activity,
                    "points_earned": points_earned,
                    "monthly_total": monthly_total,
                    "monthly_activities": monthly_activities,
                })),
            )
                .into_response()
        }
        Ok(RecordOutcome::Updated { activity }) => {
            state
                .feed
                .publish("daily_activities", ChangeKind::Update, &activity);
            Json(json!({ "status": "updated", "activity": activity })).into_response()
        }
        Err(ActivityError::EmptyDescription) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please fill in all required fields",
        )
            .into_response(),
        Err(ActivityError::AgentNotFound) => {
            (StatusCode::NOT_FOUND, "Agent not found").into_response()
        }
        Err(ActivityError::Db(err)) => {
            tracing::error!(%err, "failed to save activity");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save activity").into_response()
        }
    }
}

/// Explicit maintenance entry point for the leave backfill, so it can be
/// invoked and retried independently of the lookup flow.
pub async fn backfill_leave(
    State(state): State<AppState>,
    Json(req): Json<MobileRequest>,
) -> Response {
    let profile = match activity::find_agent_by_mobile(&state.db, &req.mobile).await {
        Ok(profile) => profile,
        Err(ActivityError::AgentNotFound) => {
            return (StatusCode::NOT_FOUND, "Agent not found").into_response();
        }
        Err(err) => {
            tracing::error!(%err, "agent lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to find agent").into_response();
        }
    };

    let today = Utc::now().date_naive();
    match activity::ensure_leave_for_yesterday(&state.db, &profile.agent, today).await {
        Ok(created) => {
            if let Some(leave) = &created {
                state
                    .feed
                    .publish("daily_activities", ChangeKind::Insert, leave);
            }
            Json(json!({ "created": created })).into_response()
        }
        Err(err) => {
            tracing::error!(%err, "leave backfill failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to backfill leave",
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub year: i32,
    pub month: u32,
}

/// Display classification for every day of the requested month.
pub async fn calendar(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Response {
    let Some(first) = NaiveDate::from_ymd_opt(query.year, query.month, 1) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Invalid year or month").into_response();
    };

    let logged = match activity::list_activities(&state.db, agent_id).await {
        Ok(activities) => activities
            .into_iter()
            .map(|a| a.activity_date)
            .collect::<std::collections::HashSet<_>>(),
        Err(err) => {
            tracing::error!(%err, "failed to fetch activities");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch activities",
            )
                .into_response();
        }
    };

    let today = Utc::now().date_naive();
    let days: Vec<_> = first
        .iter_days()
        .take_while(|d| d.month() == query.month)
        .map(|d| json!({ "date": d, "class": classify_date(d, today, &logged) }))
        .collect();

    Json(days).into_response()
}
