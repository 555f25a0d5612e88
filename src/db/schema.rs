//! SQL DDL for the roster database.

/// SQLite schema with:
/// - `users.username` and `sections.section_name` UNIQUE
/// - `users.role` restricted to the three known roles
/// - `student_sections` keyed by student, so a student holds at most one section
/// - `teacher_sections` keyed by the (teacher, section) pair
/// - assignment rows cascade away with their user or section
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('Student', 'Teacher', 'Admin')),
    created_at TEXT NOT NULL -- RFC3339
);

CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS student_sections (
    student_id INTEGER NOT NULL PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    section_id INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS teacher_sections (
    teacher_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    section_id INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
    PRIMARY KEY (teacher_id, section_id)
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
CREATE INDEX IF NOT EXISTS idx_teacher_sections_section ON teacher_sections(section_id)
"#;
