use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use obratrack_application::{DeniedAttempt, DeniedAttemptEntry, DeniedAttemptRepository};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::UserId;

/// PostgreSQL-backed storage for denied mutating attempts.
///
/// Kept apart from the audit log: that table records only successful
/// mutations, this one records the rejections operators review.
#[derive(Clone)]
pub struct PostgresDeniedAttemptRepository {
    pool: PgPool,
}

impl PostgresDeniedAttemptRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DeniedAttemptRow {
    entry_id: uuid::Uuid,
    user_id: uuid::Uuid,
    resource: String,
    action: String,
    reason: String,
    detail: String,
    created_at: String,
}

#[async_trait]
impl DeniedAttemptRepository for PostgresDeniedAttemptRepository {
    async fn append_attempt(&self, attempt: DeniedAttempt) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO denied_attempts (user_id, resource, action, reason, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attempt.user_id.as_uuid())
        .bind(attempt.resource.as_str())
        .bind(attempt.action.as_str())
        .bind(attempt.reason.as_str())
        .bind(&attempt.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record denied attempt: {error}")))?;

        Ok(())
    }

    async fn list_recent_attempts(
        &self,
        limit: usize,
        offset: usize,
    ) -> AppResult<Vec<DeniedAttemptEntry>> {
        let capped_limit = limit.clamp(1, 200) as i64;
        let capped_offset = offset.min(5_000) as i64;
        let rows = sqlx::query_as::<_, DeniedAttemptRow>(
            r#"
            SELECT
                id AS entry_id,
                user_id,
                resource,
                action,
                reason,
                detail,
                to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
            FROM denied_attempts
            ORDER BY created_at DESC
            LIMIT $1
            OFFSET $2
            "#,
        )
        .bind(capped_limit)
        .bind(capped_offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list denied attempts: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|row| DeniedAttemptEntry {
                entry_id: row.entry_id.to_string(),
                user_id: UserId::from_uuid(row.user_id),
                resource: row.resource,
                action: row.action,
                reason: row.reason,
                detail: row.detail,
                created_at: row.created_at,
            })
            .collect())
    }
}
