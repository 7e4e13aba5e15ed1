use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use obratrack_application::TokenRepository;
use obratrack_core::{AppError, AppResult};
use obratrack_domain::UserId;

/// PostgreSQL-backed storage for bearer-token hashes.
///
/// Raw tokens never reach this table; only SHA-256 hashes are stored.
#[derive(Clone)]
pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Removes expired token rows. Called opportunistically at startup.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM bearer_tokens
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to purge expired tokens: {error}")))?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, FromRow)]
struct TokenRow {
    user_id: uuid::Uuid,
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn insert(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bearer_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash)
        .bind(user_id.as_uuid())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store bearer token: {error}")))?;

        Ok(())
    }

    async fn find_active_subject(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserId>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT user_id
            FROM bearer_tokens
            WHERE token_hash = $1
                AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up bearer token: {error}")))?;

        Ok(row.map(|row| UserId::from_uuid(row.user_id)))
    }

    async fn revoke(&self, token_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM bearer_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke bearer token: {error}")))?;

        Ok(())
    }
}
