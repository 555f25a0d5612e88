use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::PageError;
use crate::db::Role;
use crate::error::RosterError;
use crate::middleware::auth::{clear_session_cookie, session_cookie};
use crate::server::router::RosterState;
use crate::views::{Notice, Tab};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
}

/// GET /login
pub async fn login_form(State(state): State<RosterState>) -> Result<Response, PageError> {
    Ok(state.views.respond(
        StatusCode::OK,
        Tab::Login,
        None,
        None,
        &LoginBody { username: "" },
    )?)
}

/// POST /login -> on success set the session cookie and go to the overview.
pub async fn login(
    State(state): State<RosterState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    let username = form.username.trim();
    // one bucket per submitted username
    if state
        .login_limiter
        .check_key(&username.to_string())
        .is_err()
    {
        warn!(username = %username, "login rate limit exceeded");
        return failed(&state, RosterError::RateLimited, username);
    }
    state.login_limiter.retain_recent();

    let user = state
        .storage
        .verify_credentials(username, &form.password)
        .await?;

    match user {
        Some(user) if user.role == Role::Admin => {
            info!(username = %user.username, "admin signed in");
            let jar = jar.add(session_cookie(&user.username, state.secure_cookie));
            Ok((jar, Redirect::to("/")).into_response())
        }
        _ => {
            warn!(username = %username, "rejected sign-in");
            failed(&state, RosterError::Unauthorized, username)
        }
    }
}

/// POST /logout
pub async fn logout(jar: PrivateCookieJar) -> Response {
    (jar.remove(clear_session_cookie()), Redirect::to("/login")).into_response()
}

fn failed(state: &RosterState, err: RosterError, username: &str) -> Result<Response, PageError> {
    let status = err.status();
    let message = match err {
        RosterError::Unauthorized => "Invalid username/password combination.".to_string(),
        other => other.to_string(),
    };
    Ok(state.views.respond(
        status,
        Tab::Login,
        None,
        Some(&Notice::error(message)),
        &LoginBody { username },
    )?)
}
