use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{delete, get, get_service, patch, post},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use tokio::{signal, task::AbortHandle};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{
    auth::{
        self,
        user::{AuthSession, Backend},
    },
    changes::ChangeFeed,
    ops::points::PointSettings,
    routes::{
        activity, admin,
        dashboard::{self, DashboardCounters},
        events, points, registration, reports, staff, tasks,
    },
    util::local_store::{LocalStore, POINT_SETTINGS_KEY},
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub templates: Arc<Environment<'static>>,
    pub store: Arc<LocalStore>,
    pub points: Arc<RwLock<PointSettings>>,
    pub feed: ChangeFeed,
    pub counters: Arc<RwLock<DashboardCounters>>,
}

pub async fn create_router(
    db: DatabaseConnection,
    session_store: PostgresStore,
    store: Arc<LocalStore>,
) -> anyhow::Result<Router> {
    let templates = setup_templates();
    let points_settings = load_point_settings(&store);
    let feed = ChangeFeed::default();

    let counters = Arc::new(RwLock::new(match dashboard::seed_counters(&db).await {
        Ok(counters) => counters,
        Err(err) => {
            tracing::warn!(%err, "failed to seed dashboard counters");
            DashboardCounters::default()
        }
    }));
    dashboard::spawn_counter_refresh(db.clone(), feed.clone(), counters.clone());

    let state = AppState {
        db: db.clone(),
        templates: Arc::new(templates),
        store,
        points: Arc::new(RwLock::new(points_settings)),
        feed,
        counters,
    };

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(db);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let app = Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/events", get(events::events))
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/{id}/status", post(tasks::change_status))
        .route(
            "/api/tasks/{id}/remarks",
            get(tasks::remarks).post(tasks::add_remark),
        )
        .route("/api/remarks/{id}", patch(tasks::edit_remark))
        .route("/api/activity/lookup", post(activity::lookup))
        .route("/api/activity", post(activity::record))
        .route("/api/activity/backfill-leave", post(activity::backfill_leave))
        .route("/api/activity/{agent_id}/calendar", get(activity::calendar))
        .route("/api/points", get(points::check))
        .route(
            "/api/points/settings",
            get(points::get_settings).put(points::put_settings),
        )
        .route("/api/members/register", post(registration::register))
        .route("/api/members/login", post(registration::login))
        .route("/api/registrations", get(registration::list))
        .route(
            "/api/registrations/{id}/approve",
            post(registration::approve),
        )
        .route("/api/registrations/{id}/reject", post(registration::reject))
        .route("/api/registrations/{id}", delete(registration::remove))
        .route(
            "/api/panchayaths",
            get(staff::list_panchayaths).post(staff::create_panchayath),
        )
        .route("/api/agents", get(staff::list_agents).post(staff::create_agent))
        .route("/api/teams", get(staff::list_teams).post(staff::create_team))
        .route(
            "/api/teams/{id}/members",
            get(staff::list_team_members).post(staff::add_team_member),
        )
        .route(
            "/api/admin/permissions",
            get(admin::list_permissions).post(admin::create_permission),
        )
        .route("/api/admin/permissions/{id}", patch(admin::update_permission))
        .route(
            "/api/admin/role-permissions",
            get(admin::list_role_permissions).post(admin::grant_role_permission),
        )
        .route(
            "/api/admin/role-permissions/{id}",
            delete(admin::revoke_role_permission),
        )
        .route("/api/reports/summary", get(reports::summary))
        .merge(auth::router::router())
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Point settings are loaded once here and kept in shared state; the
/// computation code never reads the store ambiently. First run persists the
/// default table, like the admin panel did on first open.
fn load_point_settings(store: &LocalStore) -> PointSettings {
    match store.get(POINT_SETTINGS_KEY) {
        Some(rows) => PointSettings::from_rows(rows),
        None => {
            let defaults = PointSettings::default();
            if let Err(err) = store.set(POINT_SETTINGS_KEY, &defaults.to_rows()) {
                tracing::warn!(%err, "failed to persist default point settings");
            }
            defaults
        }
    }
}

fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    env.add_function("asset", |path: String| -> String {
        match fs::read(Path::new("static").join(&path)) {
            Ok(contents) => format!("/static/{}?v={:x}", path, Sha256::digest(&contents)),
            Err(_) => format!("/static/{}", path),
        }
    });
    env
}

async fn index(State(state): State<AppState>, auth_session: AuthSession) -> impl IntoResponse {
    if auth_session.user.is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        let tmpl = state.templates.get_template("index.html").unwrap();
        let html = tmpl.render(minijinja::context! {}).unwrap();
        Html(html).into_response()
    }
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}
