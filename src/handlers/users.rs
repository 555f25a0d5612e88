use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::{Form, FormRejection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::PageError;
use crate::db::{Role, Section};
use crate::error::RosterError;
use crate::middleware::AdminSession;
use crate::server::router::RosterState;
use crate::service::{self, NewAccount};
use crate::views::{Notice, Tab};

/// Create-account form. `teacher_sections` repeats once per ticked box, which
/// is why this uses the `axum_extra` form extractor. `role` stays a string
/// so an absent or unknown value is reported on the page.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub student_section: Option<i64>,
    #[serde(default)]
    pub teacher_sections: Vec<i64>,
}

impl TryFrom<CreateUserForm> for NewAccount {
    type Error = RosterError;

    fn try_from(f: CreateUserForm) -> Result<Self, Self::Error> {
        let role = f.role.parse::<Role>().map_err(|_| {
            RosterError::Validation("Choose a role: Student, Teacher or Admin.".to_string())
        })?;
        Ok(Self {
            username: f.username,
            password: f.password,
            role,
            student_section: f.student_section,
            teacher_sections: f.teacher_sections,
        })
    }
}

/// Values echoed back into the form after a rejected submission.
struct Draft {
    username: String,
    role: Role,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            username: String::new(),
            role: Role::Student,
        }
    }
}

#[derive(Serialize)]
struct RoleOption {
    name: &'static str,
    selected: bool,
}

#[derive(Serialize)]
struct UserRow {
    id: i64,
    username: String,
    role: Role,
    created_at: String,
}

#[derive(Serialize)]
struct UsersBody {
    users: Vec<UserRow>,
    sections: Vec<Section>,
    roles: Vec<RoleOption>,
    draft_username: String,
}

/// GET /users
pub async fn list_users(
    State(state): State<RosterState>,
    session: AdminSession,
) -> Result<Response, PageError> {
    render(&state, &session, StatusCode::OK, None, Draft::default()).await
}

/// POST /users -> create the account and its assignments, then re-render.
pub async fn create_user(
    State(state): State<RosterState>,
    session: AdminSession,
    form: Result<Form<CreateUserForm>, FormRejection>,
) -> Result<Response, PageError> {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable account form");
            let notice =
                Notice::error("The account form could not be read; check the section choices.");
            return render(
                &state,
                &session,
                StatusCode::BAD_REQUEST,
                Some(notice),
                Draft::default(),
            )
            .await;
        }
    };
    let draft = Draft {
        username: form.username.clone(),
        role: form.role.parse().unwrap_or(Role::Student),
    };

    let created = match NewAccount::try_from(form) {
        Ok(account) => service::create_account(&state.storage, account).await,
        Err(e) => Err(e),
    };
    match created {
        Ok(user) => {
            let notice = Notice::success(format!("Created {} ({}).", user.username, user.role));
            render(&state, &session, StatusCode::OK, Some(notice), Draft::default()).await
        }
        Err(e) if e.is_user_facing() => {
            let notice = Notice::error(e.to_string());
            render(&state, &session, e.status(), Some(notice), draft).await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /users/{id}/delete
pub async fn delete_user(
    State(state): State<RosterState>,
    session: AdminSession,
    Path(user_id): Path<i64>,
) -> Result<Response, PageError> {
    match service::delete_account(&state.storage, user_id, &session.username).await {
        Ok(username) => {
            let notice = Notice::success(format!("Deleted {username} successfully!"));
            render(&state, &session, StatusCode::OK, Some(notice), Draft::default()).await
        }
        Err(e) if e.is_user_facing() => {
            let notice = Notice::error(e.to_string());
            render(&state, &session, e.status(), Some(notice), Draft::default()).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn render(
    state: &RosterState,
    session: &AdminSession,
    status: StatusCode,
    notice: Option<Notice>,
    draft: Draft,
) -> Result<Response, PageError> {
    let users = state
        .storage
        .get_all_users()
        .await?
        .into_iter()
        .map(|u| UserRow {
            id: u.id,
            username: u.username,
            role: u.role,
            created_at: u.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        })
        .collect();
    let roles = Role::ALL
        .iter()
        .map(|r| RoleOption {
            name: r.as_str(),
            selected: *r == draft.role,
        })
        .collect();

    let body = UsersBody {
        users,
        sections: state.storage.get_all_sections().await?,
        roles,
        draft_username: draft.username,
    };
    Ok(state.views.respond(
        status,
        Tab::Users,
        Some(&session.username),
        notice.as_ref(),
        &body,
    )?)
}
