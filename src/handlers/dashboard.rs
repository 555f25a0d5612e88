use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;

use super::PageError;
use crate::middleware::AdminSession;
use crate::server::router::RosterState;
use crate::service::{self, Overview};
use crate::views::Tab;

#[derive(Serialize)]
struct OverviewBody {
    #[serde(flatten)]
    overview: Overview,
    has_assignments: bool,
}

/// GET / -> metrics plus the student and teacher assignment tables.
pub async fn overview(
    State(state): State<RosterState>,
    session: AdminSession,
) -> Result<Response, PageError> {
    let overview = service::load_overview(&state.storage).await?;
    let body = OverviewBody {
        has_assignments: overview.has_assignments(),
        overview,
    };
    Ok(state.views.respond(
        StatusCode::OK,
        Tab::Overview,
        Some(&session.username),
        None,
        &body,
    )?)
}
