use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use obratrack_application::{PermissionGrant, PermissionRepository};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{Action, Resource, Role};

/// PostgreSQL-backed loader for the permission grant matrix.
///
/// The permissions catalog and role grants are seeded administratively and
/// read once per process lifetime; grant changes require a restart.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a permission row and grants it to roles. Idempotent; used by
    /// the seeding entrypoint, never at request time.
    pub async fn seed_grant(
        &self,
        resource: Resource,
        action: Action,
        roles: &[Role],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start permission seed transaction: {error}"))
        })?;

        let permission_id = sqlx::query_as::<_, PermissionIdRow>(
            r#"
            INSERT INTO permissions (name, resource, action)
            VALUES ($1, $2, $3)
            ON CONFLICT (resource, action) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(obratrack_domain::permission_name(resource, action))
        .bind(resource.as_str())
        .bind(action.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to seed permission: {error}")))?
        .id;

        for role in roles {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role, permission_id, granted)
                VALUES ($1, $2, TRUE)
                ON CONFLICT (role, permission_id) DO UPDATE SET granted = TRUE
                "#,
            )
            .bind(role.as_str())
            .bind(permission_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to seed role permission: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit permission seed transaction: {error}"))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct PermissionIdRow {
    id: uuid::Uuid,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    role: String,
    resource: String,
    action: String,
    granted: bool,
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn load_grants(&self) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT role_permissions.role,
                   permissions.resource,
                   permissions.action,
                   role_permissions.granted
            FROM role_permissions
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission grants: {error}")))?;

        rows.into_iter()
            .map(|row| {
                let role = Role::from_str(row.role.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode role '{}' in grant table: {error}",
                        row.role
                    ))
                })?;
                let resource = Resource::from_str(row.resource.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode resource '{}' in grant table: {error}",
                        row.resource
                    ))
                })?;
                let action = Action::from_str(row.action.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "failed to decode action '{}' in grant table: {error}",
                        row.action
                    ))
                })?;

                Ok(PermissionGrant {
                    role,
                    resource,
                    action,
                    granted: row.granted,
                })
            })
            .collect()
    }
}
