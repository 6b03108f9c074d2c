use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::user::AuthSession,
    changes::ChangeKind,
    ops::registration::{self, Decision, LoginOutcome, RegistrationError},
    router::AppState,
};

const TABLE: &str = "user_registration_requests";

fn error_response(err: RegistrationError, action: &str) -> Response {
    match err {
        RegistrationError::AgentNotFound => {
            (StatusCode::NOT_FOUND, "Agent not found").into_response()
        }
        RegistrationError::AlreadyRegistered => (
            StatusCode::CONFLICT,
            "This agent is already registered as a member",
        )
            .into_response(),
        RegistrationError::RequestNotFound => {
            (StatusCode::NOT_FOUND, "Registration request not found").into_response()
        }
        RegistrationError::Db(err) => {
            tracing::error!(%err, "registration operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {action}"),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub agent_id: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    match registration::register_from_agent(&state.db, req.agent_id).await {
        Ok(request) => {
            state.feed.publish(TABLE, ChangeKind::Insert, &request);
            (StatusCode::CREATED, Json(request)).into_response()
        }
        Err(err) => error_response(err, "submit registration"),
    }
}

#[derive(Deserialize)]
pub struct MemberLoginRequest {
    pub name: String,
    pub mobile: String,
}

/// Member login resolves against the registration requests; all four
/// outcomes are ordinary responses, not transport errors.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<MemberLoginRequest>,
) -> Response {
    if req.name.trim().is_empty() || req.mobile.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name and mobile number are required",
        )
            .into_response();
    }

    match registration::member_login(&state.db, &req.name, &req.mobile).await {
        Ok(LoginOutcome::Approved(member)) => Json(json!({
            "status": "approved",
            "member": {
                "id": member.id,
                "name": member.username,
                "mobile_number": member.mobile_number,
                "panchayath_id": member.panchayath_id,
                "role": "member",
            },
        }))
        .into_response(),
        Ok(LoginOutcome::Pending) => Json(json!({
            "status": "pending",
            "message": "Your registration is still pending admin approval.",
        }))
        .into_response(),
        Ok(LoginOutcome::Rejected) => Json(json!({
            "status": "rejected",
            "message": "Your registration request was rejected. Please contact the administrator.",
        }))
        .into_response(),
        Ok(LoginOutcome::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "invalid",
                "message": "Invalid name or mobile number",
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(%err, "member login failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Please try again.",
            )
                .into_response()
        }
    }
}

pub async fn list(State(state): State<AppState>, auth_session: AuthSession) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match registration::list_requests(&state.db).await {
        Ok(requests) => Json(requests).into_response(),
        Err(err) => {
            tracing::error!(%err, "failed to fetch registrations");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch member registrations",
            )
                .into_response()
        }
    }
}

async fn decide(state: AppState, auth_session: AuthSession, id: Uuid, decision: Decision) -> Response {
    let Some(admin) = auth_session.user else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match registration::decide(&state.db, id, decision, &admin.username).await {
        Ok(request) => {
            state.feed.publish(TABLE, ChangeKind::Update, &request);
            Json(request).into_response()
        }
        Err(err) => error_response(err, "update registration"),
    }
}

pub async fn approve(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    decide(state, auth_session, id, Decision::Approved).await
}

pub async fn reject(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    decide(state, auth_session, id, Decision::Rejected).await
}

pub async fn remove(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match registration::delete_request(&state.db, id).await {
        Ok(()) => {
            state
                .feed
                .publish(TABLE, ChangeKind::Delete, &json!({ "id": id }));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err, "delete registration"),
    }
}
