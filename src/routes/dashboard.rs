use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::{
    auth::user::AuthSession,
    changes::ChangeFeed,
    entities::{
        prelude::{Agent, RegistrationRequest, Task},
        registration_request, task,
    },
    router::AppState,
};

/// In-memory cache folded from the change feed. A convenience only; the
/// database stays authoritative and a dropped event just delays the next
/// refresh.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DashboardCounters {
    pub total_agents: u64,
    pub pending_tasks: u64,
    pub pending_registrations: u64,
}

pub async fn seed_counters(db: &DatabaseConnection) -> Result<DashboardCounters, DbErr> {
    let total_agents = Agent::find().count(db).await?;
    let pending_tasks = Task::find()
        .filter(task::Column::Status.eq(task::Status::Pending))
        .count(db)
        .await?;
    let pending_registrations = RegistrationRequest::find()
        .filter(registration_request::Column::Status.eq(registration_request::Status::Pending))
        .count(db)
        .await?;

    Ok(DashboardCounters {
        total_agents,
        pending_tasks,
        pending_registrations,
    })
}

/// Re-queries the counters whenever a relevant table changes. Lagged
/// receivers skip ahead; the next event triggers a full re-query anyway.
pub fn spawn_counter_refresh(
    db: DatabaseConnection,
    feed: ChangeFeed,
    counters: Arc<RwLock<DashboardCounters>>,
) {
    tokio::spawn(async move {
        let mut rx = feed.subscribe();
        loop {
            match rx.recv().await {
                Ok(event)
                    if matches!(
                        event.table,
                        "tasks" | "agents" | "user_registration_requests"
                    ) =>
                {
                    match seed_counters(&db).await {
                        Ok(fresh) => *counters.write().unwrap() = fresh,
                        Err(err) => tracing::warn!(%err, "dashboard counter refresh failed"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "dashboard counter feed lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

pub async fn dashboard(State(state): State<AppState>, auth_session: AuthSession) -> Response {
    let Some(user) = auth_session.user else {
        return Redirect::to("/login").into_response();
    };

    let counters = *state.counters.read().unwrap();
    let tmpl = state.templates.get_template("dashboard.html").unwrap();
    let html = tmpl
        .render(minijinja::context! {
            username => user.username,
            total_agents => counters.total_agents,
            pending_tasks => counters.pending_tasks,
            pending_registrations => counters.pending_registrations,
        })
        .unwrap();
    Html(html).into_response()
}
