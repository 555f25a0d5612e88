use std::collections::HashSet;

use tracing::{info, warn};

use crate::db::{Role, RosterStorage, UserSummary};
use crate::error::RosterError;

/// Submitted "create account" form, before validation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub student_section: Option<i64>,
    pub teacher_sections: Vec<i64>,
}

/// Which assignment rows a validated account gets.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Student(i64),
    Teacher(Vec<i64>),
    None,
}

/// Create a user and its section assignments.
///
/// Sections are checked against the current section list before anything is
/// written. The user row and its assignments are committed together, so a
/// rejected or failed request leaves the database untouched.
pub async fn create_account(
    storage: &RosterStorage,
    account: NewAccount,
) -> Result<UserSummary, RosterError> {
    let username = account.username.trim().to_string();
    if username.is_empty() || account.password.is_empty() {
        return Err(RosterError::Validation(
            "Username and password are required.".to_string(),
        ));
    }

    let placement = placement_for(&account)?;
    let known: HashSet<i64> = storage
        .get_all_sections()
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    let requested: &[i64] = match &placement {
        Placement::Student(id) => std::slice::from_ref(id),
        Placement::Teacher(ids) => ids,
        Placement::None => &[],
    };
    if let Some(missing) = requested.iter().find(|id| !known.contains(id)) {
        return Err(RosterError::SectionNotFound(*missing));
    }

    let (student_section, teacher_sections) = match &placement {
        Placement::Student(id) => (Some(*id), &[][..]),
        Placement::Teacher(ids) => (None, ids.as_slice()),
        Placement::None => (None, &[][..]),
    };
    let Some(user) = storage
        .create_user_with_sections(
            &username,
            &account.password,
            account.role,
            student_section,
            teacher_sections,
        )
        .await?
    else {
        warn!(username = %username, "rejected duplicate username");
        return Err(RosterError::DuplicateUsername(username));
    };

    info!(
        id = user.id,
        username = %user.username,
        role = %user.role,
        sections = requested.len(),
        "account created"
    );
    Ok(user.into())
}

fn placement_for(account: &NewAccount) -> Result<Placement, RosterError> {
    match account.role {
        Role::Student => account
            .student_section
            .map(Placement::Student)
            .ok_or_else(|| {
                RosterError::Validation("A student must be assigned exactly one section.".into())
            }),
        Role::Teacher => {
            let mut seen = HashSet::new();
            let ids = account
                .teacher_sections
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect();
            Ok(Placement::Teacher(ids))
        }
        Role::Admin => Ok(Placement::None),
    }
}

/// Delete a user by id and return its username.
///
/// `acting_admin` is the signed-in account; it cannot delete itself.
pub async fn delete_account(
    storage: &RosterStorage,
    user_id: i64,
    acting_admin: &str,
) -> Result<String, RosterError> {
    let user = storage
        .get_user_by_id(user_id)
        .await?
        .ok_or(RosterError::UserNotFound(user_id))?;

    if user.username == acting_admin {
        return Err(RosterError::Validation(format!(
            "Failed to delete {}: you are signed in with this account.",
            user.username
        )));
    }

    if !storage.delete_user(user_id).await? {
        return Err(RosterError::UserNotFound(user_id));
    }

    info!(id = user_id, username = %user.username, "account deleted");
    Ok(user.username)
}
