use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use time::Duration;
use tracing::debug;

use crate::db::Role;
use crate::error::RosterError;
use crate::server::router::RosterState;
use crate::views::html_500;

pub const SESSION_COOKIE: &str = "roster_admin";
const SESSION_HOURS: i64 = 8;

/// A signed-in admin.
///
/// The session cookie only carries the username; the account is re-checked on
/// every request so a deleted or demoted admin loses access immediately.
/// HTML routes redirect to `/login` when the check fails, `/api/*` routes
/// answer 401.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
}

impl FromRequestParts<RosterState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RosterState,
    ) -> Result<Self, Self::Rejection> {
        let wants_json = parts.uri.path().starts_with("/api/");
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        let Some(username) = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()) else {
            return Err(reject(wants_json));
        };

        match state.storage.get_user(&username).await {
            Ok(Some(user)) if user.role == Role::Admin => Ok(Self { username }),
            Ok(_) => {
                debug!(username = %username, "session no longer belongs to an admin");
                Err(reject(wants_json))
            }
            Err(e) if wants_json => Err(e.into_response()),
            Err(e) => {
                tracing::error!(error = %e, "session lookup failed");
                Err(html_500())
            }
        }
    }
}

fn reject(wants_json: bool) -> Response {
    if wants_json {
        RosterError::Unauthorized.into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

pub fn session_cookie(username: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, username.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(SESSION_HOURS))
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
