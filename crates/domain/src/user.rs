//! User identity types: roles, sectors, and validation rules.

use std::str::FromStr;

use obratrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProjectId;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Fixed role hierarchy recognized by authorization checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted access to every resource and action.
    Admin,
    /// Oversees execution; reads across sectors, mutates within scope.
    Supervisor,
    /// Field engineer assigned to one sector.
    Engineer,
    /// Equipment operator assigned to one sector.
    Operator,
    /// Read-only dashboard access.
    Viewer,
    /// Safety (SESMT) staff.
    Sesmt,
}

impl Role {
    /// Returns the stable storage string for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supervisor => "supervisor",
            Self::Engineer => "engineer",
            Self::Operator => "operator",
            Self::Viewer => "viewer",
            Self::Sesmt => "sesmt",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::Admin,
            Role::Supervisor,
            Role::Engineer,
            Role::Operator,
            Role::Viewer,
            Role::Sesmt,
        ];

        ALL
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "supervisor" => Ok(Self::Supervisor),
            "engineer" => Ok(Self::Engineer),
            "operator" => Ok(Self::Operator),
            "viewer" => Ok(Self::Viewer),
            "sesmt" => Ok(Self::Sesmt),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Organizational sector tag scoping visibility and mutation rights.
///
/// `Sector::All` means the holder is unrestricted within sector-scoped
/// checks; a named sector restricts the holder to matching resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// Unrestricted sector scope.
    All,
    /// A single named sector, stored lowercase.
    Named(String),
}

impl Sector {
    /// Parses a storage string into a sector tag.
    ///
    /// Named sectors are trimmed and lowercased; empty tags are rejected.
    pub fn parse(value: &str) -> AppResult<Self> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::Validation(
                "sector tag must not be empty".to_owned(),
            ));
        }

        if normalized == "all" {
            return Ok(Self::All);
        }

        Ok(Self::Named(normalized))
    }

    /// Returns the stable storage string for this sector.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Named(name) => name.as_str(),
        }
    }

    /// Returns whether this sector scope covers a resource in `other`.
    #[must_use]
    pub fn covers(&self, other: &Sector) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => matches!(other, Self::Named(other_name) if name == other_name),
        }
    }

    /// Returns whether this is the unrestricted scope.
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least
    /// one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length (NIST SP800-63B).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length to allow passphrases while bounding Argon2 cost.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password against length rules.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Resolved identity of an authenticated request actor.
///
/// Built by the identity resolver after the bearer token and the active flag
/// have both been checked; carried through request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    id: UserId,
    name: String,
    role: Role,
    sector: Sector,
    project_id: Option<ProjectId>,
}

impl AuthenticatedUser {
    /// Creates an authenticated identity from resolved user data.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        role: Role,
        sector: Sector,
        project_id: Option<ProjectId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            sector,
            project_id,
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the sector scope.
    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// Returns the owning project boundary, if the user is project-scoped.
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip_storage_value() {
        for role in Role::all() {
            let restored = Role::from_str(role.as_str());
            assert_eq!(restored.ok(), Some(*role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::from_str("foreman").is_err());
    }

    #[test]
    fn sector_all_covers_everything() {
        let all = Sector::All;
        assert!(all.covers(&Sector::Named("electrical".to_owned())));
        assert!(all.covers(&Sector::All));
    }

    #[test]
    fn named_sector_covers_only_itself() {
        let electrical = Sector::parse("electrical");
        let mechanical = Sector::parse("mechanical");
        let (electrical, mechanical) = match (electrical, mechanical) {
            (Ok(a), Ok(b)) => (a, b),
            _ => panic!("test"),
        };

        assert!(electrical.covers(&electrical.clone()));
        assert!(!electrical.covers(&mechanical));
        assert!(!electrical.covers(&Sector::All));
    }

    #[test]
    fn sector_parse_normalizes_case() {
        assert_eq!(
            Sector::parse("  Electrical ").map(|s| s.as_str().to_owned()).ok(),
            Some("electrical".to_owned())
        );
        assert_eq!(Sector::parse("ALL").ok(), Some(Sector::All));
    }

    #[test]
    fn empty_sector_is_rejected() {
        assert!(Sector::parse("   ").is_err());
    }

    #[test]
    fn valid_email_is_accepted() {
        let email = EmailAddress::new("USER@Example.COM");
        assert_eq!(
            email.map(|value| value.as_str().to_owned()).ok(),
            Some("user@example.com".to_owned())
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn adequate_password_is_accepted() {
        assert!(validate_password("a-reasonable-passphrase").is_ok());
    }

    #[test]
    fn very_long_password_is_rejected() {
        let long = "a".repeat(PASSWORD_MAX_LENGTH + 1);
        assert!(validate_password(&long).is_err());
    }
}
