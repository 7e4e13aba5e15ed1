//! Administrative user management.
//!
//! User rows are soft-disabled, never hard-deleted, so audit entries keep a
//! valid actor reference for their whole retention window.

use std::sync::Arc;

use obratrack_core::{AppError, AppResult, NonEmptyString};
use obratrack_domain::{
    Action, AuditAction, AuthenticatedUser, EmailAddress, ProjectId, Resource, Role, Sector,
    UserId, validate_password,
};
use serde_json::json;

use crate::audit_service::{AuditEvent, AuditRecorder, ClientMeta};
use crate::authorization_service::AuthorizationService;
use crate::identity_service::{NewUserRecord, PasswordHasher, UserRecord, UserRepository};

/// Caller parameters for user creation.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    /// Display name.
    pub name: String,
    /// Email address used for login.
    pub email: String,
    /// Plaintext password, validated and hashed here.
    pub password: String,
    /// Assigned role.
    pub role: Role,
    /// Assigned sector scope.
    pub sector: Sector,
    /// Owning project boundary, if scoped.
    pub project_id: Option<ProjectId>,
    /// Client metadata for the audit trail.
    pub client: ClientMeta,
}

/// Application service for user administration.
#[derive(Clone)]
pub struct UserAdminService {
    users: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    authorization: AuthorizationService,
    audit: AuditRecorder,
}

impl UserAdminService {
    /// Creates the user administration service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        authorization: AuthorizationService,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            users,
            password_hasher,
            authorization,
            audit,
        }
    }

    /// Creates a user account.
    pub async fn create_user(
        &self,
        actor: &AuthenticatedUser,
        params: CreateUserParams,
    ) -> AppResult<UserId> {
        self.authorization
            .authorize(actor, Resource::Users, Action::Create, None)
            .await?;

        let name = NonEmptyString::new(params.name)?;
        let email = EmailAddress::new(&params.email)?;
        validate_password(&params.password)?;

        if self.users.find_by_email(email.as_str()).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "a user with email '{}' already exists",
                email.as_str()
            )));
        }

        let password_hash = self.password_hasher.hash_password(&params.password)?;
        let user_id = self
            .users
            .create(NewUserRecord {
                name: name.as_str().to_owned(),
                email: email.as_str().to_owned(),
                role: params.role,
                sector: params.sector.clone(),
                project_id: params.project_id,
                password_hash,
            })
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::UserCreated,
            resource: Resource::Users,
            resource_id: Some(user_id.to_string()),
            details: Some(json!({
                "email": email.as_str(),
                "role": params.role.as_str(),
                "sector": params.sector.as_str(),
            })),
            client: params.client,
        });

        Ok(user_id)
    }

    /// Lists all user accounts.
    pub async fn list_users(&self, actor: &AuthenticatedUser) -> AppResult<Vec<UserRecord>> {
        self.authorization
            .authorize(actor, Resource::Users, Action::Read, None)
            .await?;

        self.users.list().await
    }

    /// Toggles a user's active flag.
    ///
    /// Actors cannot deactivate themselves; that would strand the account
    /// with no one able to reverse it from the same session.
    pub async fn set_active(
        &self,
        actor: &AuthenticatedUser,
        user_id: UserId,
        active: bool,
        client: ClientMeta,
    ) -> AppResult<()> {
        self.authorization
            .authorize(actor, Resource::Users, Action::Update, None)
            .await?;

        if actor.id() == user_id && !active {
            return Err(AppError::Validation(
                "users cannot deactivate their own account".to_owned(),
            ));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;

        self.users.set_active(user_id, active).await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::UserActivationChanged,
            resource: Resource::Users,
            resource_id: Some(user_id.to_string()),
            details: Some(json!({
                "before": { "active": user.active },
                "after": { "active": active },
            })),
            client,
        });

        Ok(())
    }

    /// Updates a user's role, sector scope and project boundary.
    pub async fn update_assignment(
        &self,
        actor: &AuthenticatedUser,
        user_id: UserId,
        role: Role,
        sector: Sector,
        project_id: Option<ProjectId>,
        client: ClientMeta,
    ) -> AppResult<()> {
        self.authorization
            .authorize(actor, Resource::Users, Action::Update, None)
            .await?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;

        self.users
            .update_assignment(user_id, role, sector.clone(), project_id)
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::UserUpdated,
            resource: Resource::Users,
            resource_id: Some(user_id.to_string()),
            details: Some(json!({
                "before": { "role": user.role.as_str(), "sector": user.sector.as_str() },
                "after": { "role": role.as_str(), "sector": sector.as_str() },
            })),
            client,
        });

        Ok(())
    }
}
