use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::user::AuthSession,
    changes::ChangeKind,
    ops::tasks::{
        self, Actor, AssignmentFilter, ClosingStatus, NewTask, StatusFilter, TaskError, TaskFilter,
    },
    router::AppState,
};

fn error_response(err: TaskError, action: &str) -> Response {
    match err {
        TaskError::NotFound => (StatusCode::NOT_FOUND, "Task not found").into_response(),
        TaskError::RemarkNotFound => (StatusCode::NOT_FOUND, "Remark not found").into_response(),
        TaskError::AlreadyClosed => {
            (StatusCode::CONFLICT, "Task is no longer pending").into_response()
        }
        TaskError::Unauthorized => {
            (StatusCode::FORBIDDEN, "Not allowed to act on this task").into_response()
        }
        TaskError::EmptyTitle | TaskError::EmptyRemark | TaskError::InvalidAllocation => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
        }
        TaskError::Db(err) => {
            tracing::error!(%err, "task operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {action}"),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct TaskListQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub assignment: AssignmentFilter,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<TaskListQuery>) -> Response {
    let filter = TaskFilter {
        status: query.status,
        assignment: query.assignment,
    };
    match tasks::list_tasks(&state.db, filter, Utc::now().naive_utc()).await {
        Ok(tasks) => Json(tasks).into_response(),
        Err(err) => {
            tracing::error!(%err, "failed to fetch tasks");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch tasks").into_response()
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewTask>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match tasks::create_task(&state.db, new).await {
        Ok(task) => {
            state.feed.publish("tasks", ChangeKind::Insert, &task);
            (StatusCode::CREATED, Json(task)).into_response()
        }
        Err(err) => error_response(err, "create task"),
    }
}

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: ClosingStatus,
    pub remark: Option<String>,
    pub actor_name: Option<String>,
    pub actor_mobile: Option<String>,
}

fn actor_from(auth_session: &AuthSession, name: Option<String>, mobile: Option<String>) -> Actor {
    match &auth_session.user {
        Some(user) => Actor::admin(user.username.clone()),
        None => Actor::member(name, mobile),
    }
}

pub async fn change_status(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(task_id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Response {
    let actor = actor_from(&auth_session, req.actor_name, req.actor_mobile);
    match tasks::change_status(&state.db, task_id, req.status, req.remark.as_deref(), &actor).await
    {
        Ok(task) => {
            state.feed.publish("tasks", ChangeKind::Update, &task);
            Json(task).into_response()
        }
        Err(err) => error_response(err, "update task status"),
    }
}

pub async fn remarks(State(state): State<AppState>, Path(task_id): Path<Uuid>) -> Response {
    match tasks::list_remarks(&state.db, task_id).await {
        Ok(remarks) => Json(remarks).into_response(),
        Err(err) => {
            tracing::error!(%err, "failed to fetch task remarks");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch task remarks",
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct AddRemarkRequest {
    pub remark: String,
    pub actor_name: Option<String>,
    pub actor_mobile: Option<String>,
}

pub async fn add_remark(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AddRemarkRequest>,
) -> Response {
    let actor = actor_from(&auth_session, req.actor_name, req.actor_mobile);
    match tasks::add_remark(&state.db, task_id, &req.remark, &actor).await {
        Ok(remark) => {
            state.feed.publish("task_remarks", ChangeKind::Insert, &remark);
            (StatusCode::CREATED, Json(remark)).into_response()
        }
        Err(err) => error_response(err, "add remark"),
    }
}

#[derive(Deserialize)]
pub struct EditRemarkRequest {
    pub remark: String,
}

pub async fn edit_remark(
    State(state): State<AppState>,
    Path(remark_id): Path<Uuid>,
    Json(req): Json<EditRemarkRequest>,
) -> Response {
    match tasks::edit_remark(&state.db, remark_id, &req.remark).await {
        Ok(remark) => {
            state.feed.publish("task_remarks", ChangeKind::Update, &remark);
            Json(remark).into_response()
        }
        Err(err) => error_response(err, "update remark"),
    }
}
