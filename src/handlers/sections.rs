use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};

use super::PageError;
use crate::db::Section;
use crate::middleware::AdminSession;
use crate::server::router::RosterState;
use crate::service;
use crate::views::{Notice, Tab};

#[derive(Debug, Deserialize)]
pub struct CreateSectionForm {
    #[serde(default)]
    pub section_name: String,
}

#[derive(Serialize)]
struct SectionsBody {
    sections: Vec<Section>,
    draft_name: String,
}

/// GET /sections
pub async fn list_sections(
    State(state): State<RosterState>,
    session: AdminSession,
) -> Result<Response, PageError> {
    render(&state, &session, StatusCode::OK, None, String::new()).await
}

/// POST /sections -> create, then show the refreshed list.
pub async fn create_section(
    State(state): State<RosterState>,
    session: AdminSession,
    Form(form): Form<CreateSectionForm>,
) -> Result<Response, PageError> {
    match service::create_section(&state.storage, &form.section_name).await {
        Ok(name) => {
            let notice = Notice::success(format!("Section {name} created!"));
            render(&state, &session, StatusCode::OK, Some(notice), String::new()).await
        }
        Err(e) if e.is_user_facing() => {
            let notice = Notice::error(e.to_string());
            render(&state, &session, e.status(), Some(notice), form.section_name).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render(
    state: &RosterState,
    session: &AdminSession,
    status: StatusCode,
    notice: Option<Notice>,
    draft_name: String,
) -> Result<Response, PageError> {
    let body = SectionsBody {
        sections: state.storage.get_all_sections().await?,
        draft_name,
    };
    Ok(state.views.respond(
        status,
        Tab::Sections,
        Some(&session.username),
        notice.as_ref(),
        &body,
    )?)
}
