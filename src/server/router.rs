use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::BasicConfig;
use crate::db::RosterStorage;
use crate::error::RosterError;
use crate::handlers::{api, dashboard, sections, session, users};
use crate::views::Views;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct RosterState {
    pub storage: RosterStorage,
    pub views: Arc<Views>,
    /// Sign-in attempts, keyed by the submitted username.
    pub login_limiter: Arc<DefaultKeyedRateLimiter<String>>,
    pub secure_cookie: bool,
    key: Key,
}

impl RosterState {
    pub fn new(storage: RosterStorage, cfg: &BasicConfig) -> Result<Self, RosterError> {
        let key = Key::try_from(cfg.cookie_secret.as_bytes()).unwrap_or_else(|_| {
            warn!("cookie_secret shorter than 64 bytes; sessions will not survive a restart");
            Key::generate()
        });
        let per_minute = NonZeroU32::new(cfg.login_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            storage,
            views: Arc::new(Views::new()?),
            login_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            secure_cookie: !cfg.insecure_cookie,
            key,
        })
    }
}

impl FromRef<RosterState> for Key {
    fn from_ref(state: &RosterState) -> Self {
        state.key.clone()
    }
}

pub fn roster_router(state: RosterState) -> Router {
    Router::new()
        .route("/", get(dashboard::overview))
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}/delete", post(users::delete_user))
        .route(
            "/sections",
            get(sections::list_sections).post(sections::create_section),
        )
        .route("/login", get(session::login_form).post(session::login))
        .route("/logout", post(session::logout))
        .route("/api/overview", get(api::overview))
        .route("/api/users", get(api::users))
        .route("/api/sections", get(api::sections))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
