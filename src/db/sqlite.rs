use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, warn};

use crate::db::models::{AssignmentRow, DbUser, Role, Section, UserSummary};
use crate::db::password;
use crate::db::schema::SQLITE_INIT;
use crate::error::RosterError;

pub type SqlitePool = Pool<Sqlite>;

/// Data access layer over the roster tables. Every call checks a connection
/// out of the pool for its own duration.
#[derive(Clone)]
pub struct RosterStorage {
    pool: SqlitePool,
}

impl RosterStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RosterError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), RosterError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Scoped connection for ad hoc queries; returned to the pool on drop.
    pub async fn connection(&self) -> Result<PoolConnection<Sqlite>, RosterError> {
        Ok(self.pool.acquire().await?)
    }

    /// Insert a user. Returns `false` when the username is already taken.
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<bool, RosterError> {
        let digest = password::hash_password(password)?;
        let mut conn = self.connection().await?;
        Self::insert_user(&mut *conn, username, &digest, role).await
    }

    /// Insert a user and its section assignments in one transaction.
    ///
    /// Returns `None` when the username is already taken. If any assignment
    /// fails, the user row is rolled back with it.
    pub async fn create_user_with_sections(
        &self,
        username: &str,
        password: &str,
        role: Role,
        student_section: Option<i64>,
        teacher_sections: &[i64],
    ) -> Result<Option<DbUser>, RosterError> {
        let digest = password::hash_password(password)?;
        let mut tx = self.pool.begin().await?;

        if !Self::insert_user(&mut *tx, username, &digest, role).await? {
            return Ok(None);
        }
        let user = Self::select_user(&mut *tx, username)
            .await?
            .ok_or(RosterError::Database(sqlx::Error::RowNotFound))?;

        if let Some(section_id) = student_section {
            Self::insert_student_section(&mut *tx, user.id, section_id).await?;
        }
        for section_id in teacher_sections {
            Self::insert_teacher_section(&mut *tx, user.id, *section_id).await?;
        }

        tx.commit().await?;
        Ok(Some(user))
    }

    /// Remove a user together with its assignment rows. Returns `false` when
    /// no user has this id.
    pub async fn delete_user(&self, user_id: i64) -> Result<bool, RosterError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM student_sections WHERE student_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM teacher_sections WHERE teacher_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed > 0)
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserSummary>, RosterError> {
        let rows = sqlx::query(
            "SELECT id, username, password, role, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| Self::row_to_user(row).map(UserSummary::from))
            .collect()
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<DbUser>, RosterError> {
        let mut conn = self.connection().await?;
        Self::select_user(&mut *conn, username).await
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<DbUser>, RosterError> {
        let row = sqlx::query(
            "SELECT id, username, password, role, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_user).transpose()
    }

    /// Insert a section. Returns `false` when the name is already taken.
    pub async fn add_section(&self, section_name: &str) -> Result<bool, RosterError> {
        let result = sqlx::query("INSERT INTO sections (section_name) VALUES (?)")
            .bind(section_name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!(section_name, "section name already taken");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_all_sections(&self) -> Result<Vec<Section>, RosterError> {
        let rows = sqlx::query("SELECT id, section_name FROM sections ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok::<_, RosterError>(Section {
                    id: row.try_get("id")?,
                    section_name: row.try_get("section_name")?,
                })
            })
            .collect()
    }

    /// A student holds one section; assigning again replaces it.
    pub async fn assign_section_to_student(
        &self,
        user_id: i64,
        section_id: i64,
    ) -> Result<(), RosterError> {
        let mut conn = self.connection().await?;
        Self::insert_student_section(&mut *conn, user_id, section_id).await
    }

    /// Repeating an existing (teacher, section) pair is a no-op.
    pub async fn assign_section_to_teacher(
        &self,
        user_id: i64,
        section_id: i64,
    ) -> Result<(), RosterError> {
        let mut conn = self.connection().await?;
        Self::insert_teacher_section(&mut *conn, user_id, section_id).await
    }

    pub async fn count_users(&self) -> Result<i64, RosterError> {
        let mut conn = self.connection().await?;
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn count_sections(&self) -> Result<i64, RosterError> {
        let mut conn = self.connection().await?;
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sections")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// Every student with their section; unassigned students carry `None`.
    pub async fn students_with_sections(&self) -> Result<Vec<AssignmentRow>, RosterError> {
        let mut conn = self.connection().await?;
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, s.section_name
            FROM users u
            LEFT JOIN student_sections ss ON u.id = ss.student_id
            LEFT JOIN sections s ON ss.section_id = s.id
            WHERE u.role = 'Student'
            ORDER BY u.id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(Self::row_to_assignment).collect()
    }

    /// Every teacher once per section they hold, or once with `None`.
    pub async fn teachers_with_sections(&self) -> Result<Vec<AssignmentRow>, RosterError> {
        let mut conn = self.connection().await?;
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.username, s.section_name
            FROM users u
            LEFT JOIN teacher_sections ts ON u.id = ts.teacher_id
            LEFT JOIN sections s ON ts.section_id = s.id
            WHERE u.role = 'Teacher'
            ORDER BY u.id, s.section_name
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(Self::row_to_assignment).collect()
    }

    /// Look up `username` and check `password` against its stored digest.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<DbUser>, RosterError> {
        let user = self.get_user(username).await?;
        Ok(user.filter(|u| password::verify_password(&u.password, password)))
    }

    /// Create an admin account unless one already exists. Returns whether an
    /// account was created.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, RosterError> {
        let admins = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(Role::Admin.as_str())
            .fetch_one(&self.pool)
            .await?;
        if admins > 0 {
            return Ok(false);
        }

        if self.add_user(username, password, Role::Admin).await? {
            info!(username, "bootstrap admin account created");
            Ok(true)
        } else {
            warn!(
                username,
                "bootstrap admin username is taken by a non-admin account; no admin created"
            );
            Ok(false)
        }
    }

    async fn insert_user(
        conn: &mut SqliteConnection,
        username: &str,
        digest: &str,
        role: Role,
    ) -> Result<bool, RosterError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(digest)
        .bind(role.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!(username, "username already taken");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn select_user(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Option<DbUser>, RosterError> {
        let row = sqlx::query(
            "SELECT id, username, password, role, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn insert_student_section(
        conn: &mut SqliteConnection,
        user_id: i64,
        section_id: i64,
    ) -> Result<(), RosterError> {
        sqlx::query(
            r#"
            INSERT INTO student_sections (student_id, section_id) VALUES (?, ?)
            ON CONFLICT(student_id) DO UPDATE SET section_id = excluded.section_id
            "#,
        )
        .bind(user_id)
        .bind(section_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn insert_teacher_section(
        conn: &mut SqliteConnection,
        user_id: i64,
        section_id: i64,
    ) -> Result<(), RosterError> {
        sqlx::query(
            r#"
            INSERT INTO teacher_sections (teacher_id, section_id) VALUES (?, ?)
            ON CONFLICT(teacher_id, section_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(section_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    fn row_to_user(row: SqliteRow) -> Result<DbUser, RosterError> {
        let id: i64 = row.try_get("id")?;
        let username: String = row.try_get("username")?;
        let password: String = row.try_get("password")?;
        let role_str: String = row.try_get("role")?;
        let created_at_str: String = row.try_get("created_at")?;

        let role = Role::from_str(&role_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(DbUser {
            id,
            username,
            password,
            role,
            created_at,
        })
    }

    fn row_to_assignment(row: SqliteRow) -> Result<AssignmentRow, RosterError> {
        Ok(AssignmentRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            section_name: row.try_get("section_name")?,
        })
    }
}
