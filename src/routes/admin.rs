use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::user::AuthSession,
    entities::{
        admin_permission, admin_role_permission,
        prelude::{AdminPermission, AdminRolePermission},
    },
    router::AppState,
};

fn db_error(err: sea_orm::DbErr, action: &str) -> Response {
    tracing::error!(%err, "admin permission operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {action}"),
    )
        .into_response()
}

pub async fn list_permissions(State(state): State<AppState>, auth_session: AuthSession) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match AdminPermission::find()
        .order_by_asc(admin_permission::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => db_error(err, "fetch permissions"),
    }
}

#[derive(Deserialize)]
pub struct NewPermission {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_permission(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewPermission>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if new.name.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Permission name is required").into_response();
    }

    let now = Utc::now().naive_utc();
    let row = admin_permission::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name.trim().to_owned()),
        description: Set(new.description),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(err) => db_error(err, "create permission"),
    }
}

#[derive(Deserialize)]
pub struct PermissionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_permission(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
    Json(update): Json<PermissionUpdate>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let permission = match AdminPermission::find_by_id(id).one(&state.db).await {
        Ok(Some(row)) => row,
        Ok(None) => return (StatusCode::NOT_FOUND, "Permission not found").into_response(),
        Err(err) => return db_error(err, "update permission"),
    };

    let mut active: admin_permission::ActiveModel = permission.into();
    if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
        active.name = Set(name.trim().to_owned());
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(Utc::now().naive_utc());
    match active.update(&state.db).await {
        Ok(row) => Json(row).into_response(),
        Err(err) => db_error(err, "update permission"),
    }
}

#[derive(Deserialize)]
pub struct RolePermissionQuery {
    pub role: Option<String>,
}

pub async fn list_role_permissions(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(query): Query<RolePermissionQuery>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut find = AdminRolePermission::find().find_also_related(AdminPermission);
    if let Some(role) = query.role {
        find = find.filter(admin_role_permission::Column::Role.eq(role));
    }
    match find.all(&state.db).await {
        Ok(rows) => {
            let rows: Vec<_> = rows
                .into_iter()
                .map(|(grant, permission)| {
                    serde_json::json!({ "grant": grant, "permission": permission })
                })
                .collect();
            Json(rows).into_response()
        }
        Err(err) => db_error(err, "fetch role permissions"),
    }
}

#[derive(Deserialize)]
pub struct NewRolePermission {
    pub role: String,
    pub permission_id: Uuid,
}

pub async fn grant_role_permission(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewRolePermission>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if new.role.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Role is required").into_response();
    }

    let now = Utc::now().naive_utc();
    let row = admin_role_permission::ActiveModel {
        id: Set(Uuid::new_v4()),
        role: Set(new.role.trim().to_owned()),
        permission_id: Set(new.permission_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(err) => db_error(err, "grant role permission"),
    }
}

pub async fn revoke_role_permission(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<Uuid>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let grant = match AdminRolePermission::find_by_id(id).one(&state.db).await {
        Ok(Some(row)) => row,
        Ok(None) => return (StatusCode::NOT_FOUND, "Role permission not found").into_response(),
        Err(err) => return db_error(err, "revoke role permission"),
    };
    match grant.delete(&state.db).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => db_error(err, "revoke role permission"),
    }
}
