//! Identity resolution and bearer-token lifecycle.
//!
//! Tokens are opaque: 32 random bytes, hex-encoded for the client, stored
//! server-side only as SHA-256 hashes with an expiry. Resolution re-reads
//! the user row on every request so a token held by a since-deactivated
//! user fails at resolution time, not just at login. Follows OWASP guidance
//! on generic failure messages and timing hygiene.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{AuthenticatedUser, ProjectId, Role, Sector, UserId};
use tracing::debug;

/// User record returned by repository queries.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Canonical email address.
    pub email: String,
    /// Assigned role.
    pub role: Role,
    /// Assigned sector scope.
    pub sector: Sector,
    /// Whether the account may authenticate and act.
    pub active: bool,
    /// Owning project boundary, if scoped.
    pub project_id: Option<ProjectId>,
    /// Argon2id password hash.
    pub password_hash: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Builds the request identity from this record.
    #[must_use]
    pub fn to_authenticated(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(
            self.id,
            self.name.clone(),
            self.role,
            self.sector.clone(),
            self.project_id,
        )
    }
}

/// Input for creating a user row.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    /// Display name.
    pub name: String,
    /// Canonical email address.
    pub email: String,
    /// Assigned role.
    pub role: Role,
    /// Assigned sector scope.
    pub sector: Sector,
    /// Owning project boundary, if scoped.
    pub project_id: Option<ProjectId>,
    /// Argon2id password hash.
    pub password_hash: String,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Finds a user by their unique identifier.
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>>;

    /// Creates a new user record. Returns the assigned user ID.
    async fn create(&self, user: NewUserRecord) -> AppResult<UserId>;

    /// Lists all user records.
    async fn list(&self) -> AppResult<Vec<UserRecord>>;

    /// Sets the active flag. Users are soft-disabled, never hard-deleted,
    /// while audit records reference them.
    async fn set_active(&self, user_id: UserId, active: bool) -> AppResult<()>;

    /// Updates role, sector scope and project boundary.
    async fn update_assignment(
        &self,
        user_id: UserId,
        role: Role,
        sector: Sector,
        project_id: Option<ProjectId>,
    ) -> AppResult<()>;
}

/// Repository port for bearer-token storage. Only token hashes are persisted.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Stores a token hash with its expiry for a subject.
    async fn insert(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Returns the subject of a non-expired, non-revoked token hash.
    async fn find_active_subject(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserId>>;

    /// Revokes a token by hash. Revoking an unknown hash is a no-op.
    async fn revoke(&self, token_hash: &str) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps the application layer free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    /// Must run in constant time regardless of validity.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Successful login: the raw token for the client and the resolved identity.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Raw bearer token; shown to the client once, never stored.
    pub token: String,
    /// Identity of the authenticated user.
    pub user: AuthenticatedUser,
}

/// Application service resolving credentials to identities.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    token_ttl: Duration,
}

impl IdentityService {
    /// Creates the identity service with a token time-to-live.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            password_hasher,
            token_ttl,
        }
    }

    /// Authenticates with email and password, issuing a bearer token.
    ///
    /// Unknown email, wrong password and deactivated accounts all fail with
    /// the same generic credential error to prevent account enumeration;
    /// each case is logged distinctly for operators.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let user = self.users.find_by_email(email).await?;

        let Some(user) = user else {
            // Always hash to prevent timing side-channels on unknown emails.
            let _ = self.password_hasher.hash_password(password);
            debug!("login rejected: unknown email");
            return Err(AppError::InvalidCredential);
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &user.password_hash)?;

        if !password_valid {
            debug!(user_id = %user.id, "login rejected: invalid password");
            return Err(AppError::InvalidCredential);
        }

        if !user.active {
            debug!(user_id = %user.id, "login rejected: account deactivated");
            return Err(AppError::InvalidCredential);
        }

        let (raw_token, token_hash) = generate_token()?;
        let expires_at = Utc::now() + self.token_ttl;
        self.tokens.insert(user.id, &token_hash, expires_at).await?;

        Ok(AuthSession {
            token: raw_token,
            user: user.to_authenticated(),
        })
    }

    /// Resolves a bearer credential to the current user identity.
    ///
    /// The user row is re-read and the active flag re-checked on every call.
    pub async fn resolve(&self, bearer: Option<&str>) -> AppResult<AuthenticatedUser> {
        let Some(raw_token) = bearer.filter(|value| !value.trim().is_empty()) else {
            debug!("credential resolution failed: no token presented");
            return Err(AppError::MissingCredential);
        };

        let token_hash = hash_token(raw_token.trim());
        let subject = self
            .tokens
            .find_active_subject(&token_hash, Utc::now())
            .await?;

        let Some(user_id) = subject else {
            debug!("credential resolution failed: token unknown or expired");
            return Err(AppError::InvalidCredential);
        };

        let user = self.users.find_by_id(user_id).await?;

        match user {
            Some(user) if user.active => Ok(user.to_authenticated()),
            Some(user) => {
                debug!(user_id = %user.id, "credential resolution failed: subject deactivated");
                Err(AppError::UnknownOrInactiveSubject)
            }
            None => {
                debug!(%user_id, "credential resolution failed: subject no longer exists");
                Err(AppError::UnknownOrInactiveSubject)
            }
        }
    }

    /// Revokes the presented bearer token. Idempotent.
    pub async fn logout(&self, bearer: &str) -> AppResult<()> {
        let token_hash = hash_token(bearer.trim());
        self.tokens.revoke(&token_hash).await
    }

    /// Returns the password hasher for use by the user administration service.
    #[must_use]
    pub fn password_hasher(&self) -> &Arc<dyn PasswordHasher> {
        &self.password_hasher
    }
}

/// Generates a cryptographically random token and its SHA-256 hash.
///
/// Returns `(raw_token_hex, sha256_hash_hex)`.
fn generate_token() -> AppResult<(String, String)> {
    use std::fmt::Write;

    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate bearer token: {error}")))?;

    let raw_token = bytes
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        });

    let hash = hash_token(&raw_token);
    Ok((raw_token, hash))
}

/// Computes the SHA-256 hash of a token string for storage.
fn hash_token(raw_token: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    let result = hasher.finalize();

    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use obratrack_core::{AppError, AppResult};
    use obratrack_domain::{Role, Sector, UserId};
    use tokio::sync::Mutex;

    use super::{
        AuthSession, IdentityService, NewUserRecord, PasswordHasher, TokenRepository,
        UserRecord, UserRepository,
    };

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<UserRecord>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<UserRecord>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id == user_id)
                .cloned())
        }

        async fn create(&self, user: NewUserRecord) -> AppResult<UserId> {
            let id = UserId::new();
            self.users.lock().await.push(UserRecord {
                id,
                name: user.name,
                email: user.email,
                role: user.role,
                sector: user.sector,
                active: true,
                project_id: user.project_id,
                password_hash: user.password_hash,
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn list(&self) -> AppResult<Vec<UserRecord>> {
            Ok(self.users.lock().await.clone())
        }

        async fn set_active(&self, user_id: UserId, active: bool) -> AppResult<()> {
            let mut users = self.users.lock().await;
            for user in users.iter_mut() {
                if user.id == user_id {
                    user.active = active;
                }
            }
            Ok(())
        }

        async fn update_assignment(
            &self,
            _user_id: UserId,
            _role: Role,
            _sector: Sector,
            _project_id: Option<obratrack_domain::ProjectId>,
        ) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeTokenRepository {
        tokens: Mutex<HashMap<String, (UserId, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl TokenRepository for FakeTokenRepository {
        async fn insert(
            &self,
            user_id: UserId,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> AppResult<()> {
            self.tokens
                .lock()
                .await
                .insert(token_hash.to_owned(), (user_id, expires_at));
            Ok(())
        }

        async fn find_active_subject(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> AppResult<Option<UserId>> {
            Ok(self
                .tokens
                .lock()
                .await
                .get(token_hash)
                .filter(|(_, expires_at)| *expires_at > now)
                .map(|(user_id, _)| *user_id))
        }

        async fn revoke(&self, token_hash: &str) -> AppResult<()> {
            self.tokens.lock().await.remove(token_hash);
            Ok(())
        }
    }

    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    async fn service_with_user(active: bool) -> (IdentityService, Arc<FakeUserRepository>) {
        let users = Arc::new(FakeUserRepository::default());
        users.users.lock().await.push(UserRecord {
            id: UserId::new(),
            name: "Maria Souza".to_owned(),
            email: "maria@site.example".to_owned(),
            role: Role::Engineer,
            sector: Sector::Named("electrical".to_owned()),
            active,
            project_id: None,
            password_hash: "hashed:correct-horse-battery".to_owned(),
            created_at: Utc::now(),
        });

        let service = IdentityService::new(
            users.clone(),
            Arc::new(FakeTokenRepository::default()),
            Arc::new(PlainHasher),
            Duration::minutes(30),
        );

        (service, users)
    }

    async fn login(service: &IdentityService) -> AuthSession {
        match service
            .login("maria@site.example", "correct-horse-battery")
            .await
        {
            Ok(session) => session,
            Err(_) => panic!("test"),
        }
    }

    #[tokio::test]
    async fn login_issues_resolvable_token() {
        let (service, _) = service_with_user(true).await;
        let session = login(&service).await;

        let resolved = service.resolve(Some(session.token.as_str())).await;
        assert_eq!(resolved.ok(), Some(session.user));
    }

    #[tokio::test]
    async fn wrong_password_is_generic_credential_failure() {
        let (service, _) = service_with_user(true).await;
        let result = service.login("maria@site.example", "wrong-password").await;
        assert!(matches!(result, Err(AppError::InvalidCredential)));
    }

    #[tokio::test]
    async fn unknown_email_is_generic_credential_failure() {
        let (service, _) = service_with_user(true).await;
        let result = service.login("nobody@site.example", "whatever-pass").await;
        assert!(matches!(result, Err(AppError::InvalidCredential)));
    }

    #[tokio::test]
    async fn inactive_account_cannot_login() {
        let (service, _) = service_with_user(false).await;
        let result = service
            .login("maria@site.example", "correct-horse-battery")
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredential)));
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let (service, _) = service_with_user(true).await;
        let result = service.resolve(None).await;
        assert!(matches!(result, Err(AppError::MissingCredential)));

        let blank = service.resolve(Some("   ")).await;
        assert!(matches!(blank, Err(AppError::MissingCredential)));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let (service, _) = service_with_user(true).await;
        let result = service.resolve(Some("deadbeef")).await;
        assert!(matches!(result, Err(AppError::InvalidCredential)));
    }

    #[tokio::test]
    async fn deactivation_invalidates_existing_tokens() {
        let (service, users) = service_with_user(true).await;
        let session = login(&service).await;

        let user_id = session.user.id();
        let deactivated = users.set_active(user_id, false).await;
        assert!(deactivated.is_ok());

        let result = service.resolve(Some(session.token.as_str())).await;
        assert!(matches!(result, Err(AppError::UnknownOrInactiveSubject)));
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let (service, _) = service_with_user(true).await;
        let session = login(&service).await;

        let logged_out = service.logout(session.token.as_str()).await;
        assert!(logged_out.is_ok());

        let result = service.resolve(Some(session.token.as_str())).await;
        assert!(matches!(result, Err(AppError::InvalidCredential)));
    }
}
