use serde::Serialize;

use crate::db::{AssignmentRow, RosterStorage};
use crate::error::RosterError;

/// Everything the dashboard front page shows, read fresh on every call.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_users: i64,
    pub total_sections: i64,
    pub students: Vec<AssignmentRow>,
    pub teachers: Vec<AssignmentRow>,
}

impl Overview {
    pub fn has_assignments(&self) -> bool {
        !self.students.is_empty() || !self.teachers.is_empty()
    }
}

pub async fn load_overview(storage: &RosterStorage) -> Result<Overview, RosterError> {
    Ok(Overview {
        total_users: storage.count_users().await?,
        total_sections: storage.count_sections().await?,
        students: storage.students_with_sections().await?,
        teachers: storage.teachers_with_sections().await?,
    })
}
