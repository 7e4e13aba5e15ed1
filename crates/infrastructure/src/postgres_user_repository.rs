use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use obratrack_application::{NewUserRecord, UserRecord, UserRepository};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{ProjectId, Role, Sector, UserId};

/// PostgreSQL-backed repository for user accounts.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    name: String,
    email: String,
    role: String,
    sector: String,
    active: bool,
    project_id: Option<uuid::Uuid>,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(row.role.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode role '{}' for user '{}': {error}",
                row.role, row.id
            ))
        })?;
        let sector = Sector::parse(row.sector.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode sector '{}' for user '{}': {error}",
                row.sector, row.id
            ))
        })?;

        Ok(UserRecord {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            role,
            sector,
            active: row.active,
            project_id: row.project_id.map(ProjectId::from_uuid),
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, email, role, sector, active, project_id, password_hash, created_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = LOWER($1)
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by email: {error}")))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            LIMIT 1
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user by id: {error}")))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn create(&self, user: NewUserRecord) -> AppResult<UserId> {
        let id = UserId::new();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, sector, active, project_id, password_hash)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.sector.as_str())
        .bind(user.project_id.map(|project_id| project_id.as_uuid()))
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create user: {error}")))?;

        Ok(id)
    }

    async fn list(&self) -> AppResult<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY name ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        rows.into_iter().map(UserRecord::try_from).collect()
    }

    async fn set_active(&self, user_id: UserId, active: bool) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET active = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update user active flag: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' does not exist"
            )));
        }

        Ok(())
    }

    async fn update_assignment(
        &self,
        user_id: UserId,
        role: Role,
        sector: Sector,
        project_id: Option<ProjectId>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET role = $2,
                sector = $3,
                project_id = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .bind(sector.as_str())
        .bind(project_id.map(|value| value.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update user assignment: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' does not exist"
            )));
        }

        Ok(())
    }
}
