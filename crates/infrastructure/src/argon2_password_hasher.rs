//! Argon2id password hashing adapter.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use obratrack_application::PasswordHasher as PasswordHasherPort;
use obratrack_core::{AppError, AppResult};

/// Argon2id password hasher.
///
/// The crate defaults match the current OWASP Password Storage baseline
/// (Argon2id, m=19 MiB, t=2, p=1), so no parameter overrides are needed.
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with the default Argon2id parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasherPort for Argon2PasswordHasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        argon2::PasswordHasher::hash_password(&self.argon2, password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AppError::Internal(format!("failed to hash password: {error}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|error| {
            AppError::Internal(format!("failed to parse password hash: {error}"))
        })?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AppError::Internal(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use obratrack_application::PasswordHasher as PasswordHasherPort;
    use obratrack_core::AppResult;

    use super::Argon2PasswordHasher;

    #[test]
    fn roundtrip_accepts_matching_password() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("solda-orbital-42")?;
        assert!(hasher.verify_password("solda-orbital-42", &hash)?);
        Ok(())
    }

    #[test]
    fn mismatched_password_is_rejected() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("solda-orbital-42")?;
        assert!(!hasher.verify_password("solda-orbital-43", &hash)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> AppResult<()> {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash_password("solda-orbital-42")?;
        let second = hasher.hash_password("solda-orbital-42")?;
        assert_ne!(first, second);
        Ok(())
    }
}
