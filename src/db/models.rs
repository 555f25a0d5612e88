use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role, fixed at creation. Stored as its variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role {:?}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(Role::Student),
            "Teacher" => Ok(Role::Teacher),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Full `users` row, including the stored password digest.
#[derive(Debug, Clone, PartialEq)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// What the dashboard lists for a user; never carries the password.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for UserSummary {
    fn from(u: DbUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Section {
    pub id: i64,
    pub section_name: String,
}

/// One row of the user/section left join. `section_name` is `None` for an
/// unassigned user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AssignmentRow {
    pub id: i64,
    pub username: String,
    pub section_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip_through_storage_text() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "student".parse::<Role>(),
            Err(UnknownRole("student".to_string()))
        );
    }

    #[test]
    fn summary_drops_the_password() {
        let user = DbUser {
            id: 3,
            username: "alice".into(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$ZGlnZXN0".into(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserSummary::from(user)).unwrap();
        assert_eq!(json["role"], "Student");
        assert!(json.get("password").is_none());
    }
}
