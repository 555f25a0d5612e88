use axum::{Json, extract::State};

use crate::db::{Section, UserSummary};
use crate::middleware::AdminSession;
use crate::server::router::RosterState;
use crate::service::{self, Overview};
use crate::RosterError;

/// GET /api/overview
pub async fn overview(
    State(state): State<RosterState>,
    _session: AdminSession,
) -> Result<Json<Overview>, RosterError> {
    Ok(Json(service::load_overview(&state.storage).await?))
}

/// GET /api/users
pub async fn users(
    State(state): State<RosterState>,
    _session: AdminSession,
) -> Result<Json<Vec<UserSummary>>, RosterError> {
    Ok(Json(state.storage.get_all_users().await?))
}

/// GET /api/sections
pub async fn sections(
    State(state): State<RosterState>,
    _session: AdminSession,
) -> Result<Json<Vec<Section>>, RosterError> {
    Ok(Json(state.storage.get_all_sections().await?))
}
