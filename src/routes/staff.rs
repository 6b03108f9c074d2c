use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::user::AuthSession,
    changes::ChangeKind,
    entities::{
        agent::{self, Role},
        management_team, management_team_member, panchayath,
        prelude::{Agent, ManagementTeam, ManagementTeamMember, Panchayath},
    },
    router::AppState,
};

fn db_error(err: sea_orm::DbErr, action: &str) -> Response {
    tracing::error!(%err, "staff operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to {action}"),
    )
        .into_response()
}

pub async fn list_panchayaths(State(state): State<AppState>) -> Response {
    match Panchayath::find()
        .order_by_asc(panchayath::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => db_error(err, "fetch panchayaths"),
    }
}

#[derive(Deserialize)]
pub struct NewPanchayath {
    pub name: String,
    pub district: String,
    pub state: String,
}

pub async fn create_panchayath(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewPanchayath>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if new.name.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Panchayath name is required").into_response();
    }

    let now = Utc::now().naive_utc();
    let row = panchayath::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name.trim().to_owned()),
        district: Set(new.district.trim().to_owned()),
        state: Set(new.state.trim().to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => {
            state.feed.publish("panchayaths", ChangeKind::Insert, &row);
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => db_error(err, "create panchayath"),
    }
}

pub async fn list_agents(State(state): State<AppState>) -> Response {
    match Agent::find()
        .order_by_asc(agent::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => db_error(err, "fetch agents"),
    }
}

#[derive(Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub panchayath_id: Uuid,
}

pub async fn create_agent(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewAgent>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if new.name.trim().is_empty() || new.phone.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Name and phone are required").into_response();
    }

    // Phone is the unique lookup key for activity logging and points.
    match Agent::find()
        .filter(agent::Column::Phone.eq(new.phone.trim()))
        .one(&state.db)
        .await
    {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                "An agent with this mobile number already exists",
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => return db_error(err, "create agent"),
    }

    let now = Utc::now().naive_utc();
    let row = agent::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name.trim().to_owned()),
        phone: Set(new.phone.trim().to_owned()),
        role: Set(new.role),
        panchayath_id: Set(new.panchayath_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => {
            state.feed.publish("agents", ChangeKind::Insert, &row);
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => db_error(err, "create agent"),
    }
}

pub async fn list_teams(State(state): State<AppState>) -> Response {
    match ManagementTeam::find()
        .order_by_asc(management_team::Column::Name)
        .all(&state.db)
        .await
    {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => db_error(err, "fetch teams"),
    }
}

#[derive(Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_team(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(new): Json<NewTeam>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if new.name.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "Team name is required").into_response();
    }

    let now = Utc::now().naive_utc();
    let row = management_team::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(new.name.trim().to_owned()),
        description: Set(new.description),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => {
            state
                .feed
                .publish("management_teams", ChangeKind::Insert, &row);
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => db_error(err, "create team"),
    }
}

pub async fn list_team_members(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> Response {
    let members = match ManagementTeamMember::find()
        .filter(management_team_member::Column::TeamId.eq(team_id))
        .find_also_related(Agent)
        .all(&state.db)
        .await
    {
        Ok(rows) => rows,
        Err(err) => return db_error(err, "fetch team members"),
    };

    let members: Vec<_> = members
        .into_iter()
        .map(|(membership, agent)| json!({ "membership": membership, "agent": agent }))
        .collect();
    Json(members).into_response()
}

#[derive(Deserialize)]
pub struct NewTeamMember {
    pub agent_id: Uuid,
}

pub async fn add_team_member(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(team_id): Path<Uuid>,
    Json(new): Json<NewTeamMember>,
) -> Response {
    if auth_session.user.is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match Agent::find_by_id(new.agent_id).one(&state.db).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "Agent not found").into_response(),
        Err(err) => return db_error(err, "add team member"),
    }

    let existing = ManagementTeamMember::find()
        .filter(management_team_member::Column::TeamId.eq(team_id))
        .filter(management_team_member::Column::AgentId.eq(new.agent_id))
        .one(&state.db)
        .await;
    match existing {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                "Agent is already a member of this team",
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => return db_error(err, "add team member"),
    }

    let now = Utc::now().naive_utc();
    let row = management_team_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        team_id: Set(team_id),
        agent_id: Set(new.agent_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    match row.insert(&state.db).await {
        Ok(row) => {
            state
                .feed
                .publish("management_team_members", ChangeKind::Insert, &row);
            (StatusCode::CREATED, Json(row)).into_response()
        }
        Err(err) => db_error(err, "add team member"),
    }
}
