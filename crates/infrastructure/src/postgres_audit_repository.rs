use async_trait::async_trait;
use sqlx::PgPool;

use obratrack_application::{AuditEvent, AuditRepository};
use obratrack_core::{AppError, AppResult};

/// PostgreSQL-backed sink for append-only audit events.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (user_id, action, resource, resource_id, details,
                                           ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.user_id.as_uuid())
        .bind(event.action.as_str())
        .bind(event.resource.as_str())
        .bind(&event.resource_id)
        .bind(&event.details)
        .bind(&event.client.ip_address)
        .bind(&event.client.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

        Ok(())
    }
}
