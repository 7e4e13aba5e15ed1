//! Idempotent initialization of the permission matrix and bootstrap admin.
//!
//! Runs from the `seed` subcommand, never at request time; the permission
//! table is static per process lifetime once loaded.

use std::sync::Arc;

use obratrack_application::{NewUserRecord, PasswordHasher, UserRepository};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{Action, EmailAddress, Resource, Role, Sector, validate_password};
use obratrack_infrastructure::PostgresPermissionRepository;
use tracing::info;

/// Role grant matrix seeded into the permission table.
///
/// Admin rows are seeded for documentation even though the evaluator
/// short-circuits admins before consulting the table.
const GRANT_MATRIX: &[(Resource, Action, &[Role])] = &[
    (
        Resource::Projects,
        Action::Read,
        &[
            Role::Admin,
            Role::Supervisor,
            Role::Engineer,
            Role::Operator,
            Role::Viewer,
            Role::Sesmt,
        ],
    ),
    (Resource::Projects, Action::Create, &[Role::Admin, Role::Supervisor]),
    (Resource::Projects, Action::Update, &[Role::Admin, Role::Supervisor]),
    (
        Resource::Areas,
        Action::Read,
        &[
            Role::Admin,
            Role::Supervisor,
            Role::Engineer,
            Role::Operator,
            Role::Viewer,
            Role::Sesmt,
        ],
    ),
    (Resource::Areas, Action::Create, &[Role::Admin, Role::Supervisor]),
    (
        Resource::Equipment,
        Action::Read,
        &[
            Role::Admin,
            Role::Supervisor,
            Role::Engineer,
            Role::Operator,
            Role::Viewer,
            Role::Sesmt,
        ],
    ),
    (
        Resource::Equipment,
        Action::Create,
        &[Role::Admin, Role::Supervisor, Role::Engineer],
    ),
    (
        Resource::Tasks,
        Action::Read,
        &[
            Role::Admin,
            Role::Supervisor,
            Role::Engineer,
            Role::Operator,
            Role::Viewer,
            Role::Sesmt,
        ],
    ),
    (
        Resource::Tasks,
        Action::Create,
        &[Role::Admin, Role::Supervisor, Role::Engineer],
    ),
    (
        Resource::Tasks,
        Action::Update,
        &[Role::Admin, Role::Supervisor, Role::Engineer, Role::Operator],
    ),
    (Resource::Tasks, Action::Delete, &[Role::Admin, Role::Supervisor]),
    (Resource::TaskHistory, Action::Delete, &[Role::Admin, Role::Supervisor]),
    (Resource::Users, Action::Read, &[Role::Admin, Role::Supervisor]),
    (Resource::Users, Action::Create, &[Role::Admin]),
    (Resource::Users, Action::Update, &[Role::Admin, Role::Supervisor]),
    (
        Resource::AuditLog,
        Action::Read,
        &[Role::Admin, Role::Supervisor, Role::Sesmt],
    ),
];

/// Seeds the permission catalog and role grants. Idempotent.
pub async fn seed_permissions(repository: &PostgresPermissionRepository) -> AppResult<()> {
    for (resource, action, roles) in GRANT_MATRIX {
        repository.seed_grant(*resource, *action, roles).await?;
    }

    info!(grants = GRANT_MATRIX.len(), "permission matrix seeded");
    Ok(())
}

/// Creates the bootstrap admin account if it does not exist yet.
pub async fn seed_bootstrap_admin(
    users: &Arc<dyn UserRepository>,
    password_hasher: &Arc<dyn PasswordHasher>,
    email: &str,
    password: &str,
) -> AppResult<()> {
    let email = EmailAddress::new(email)?;
    validate_password(password)?;

    if users.find_by_email(email.as_str()).await?.is_some() {
        info!(email = email.as_str(), "bootstrap admin already exists");
        return Ok(());
    }

    let password_hash = password_hasher.hash_password(password)?;
    let user_id = users
        .create(NewUserRecord {
            name: "Bootstrap Admin".to_owned(),
            email: email.as_str().to_owned(),
            role: Role::Admin,
            sector: Sector::All,
            project_id: None,
            password_hash,
        })
        .await
        .map_err(|error| AppError::Internal(format!("failed to create bootstrap admin: {error}")))?;

    info!(%user_id, "bootstrap admin created");
    Ok(())
}
