use axum::{
    Form, Router,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};

use super::user::{AuthSession, Credentials};

pub fn router() -> Router<crate::router::AppState> {
    Router::new()
        .route("/login", post(self::post::login))
        .route("/login", get(self::get::login))
        .route("/logout", get(self::get::logout))
}

mod post {
    use super::*;

    pub async fn login(
        mut auth_session: AuthSession,
        Form(creds): Form<Credentials>,
    ) -> impl IntoResponse {
        let user = match auth_session.authenticate(creds.clone()).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return (StatusCode::UNAUTHORIZED, "Invalid username or password.")
                    .into_response();
            }
            Err(_) => {
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if auth_session.login(&user).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        if let Some(next) = creds.next.filter(|n| n.starts_with('/')) {
            Redirect::to(&next).into_response()
        } else {
            Redirect::to("/dashboard").into_response()
        }
    }
}

mod get {
    use super::*;

    pub async fn login() -> Html<String> {
        Html(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Gramaseva Admin Login</title>
</head>
<body>
    <h1>Gramaseva</h1>
    <form action="/login" method="post">
        <label>Username <input type="text" name="username"></label>
        <label>Password <input type="password" name="password"></label>
        <button type="submit">Login</button>
    </form>
</body>
</html>"#
                .to_string(),
        )
    }

    pub async fn logout(mut auth_session: AuthSession) -> impl IntoResponse {
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/login").into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
