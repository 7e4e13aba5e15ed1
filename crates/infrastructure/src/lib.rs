//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_task_repository;
mod postgres_audit_log_repository;
mod postgres_audit_repository;
mod postgres_denied_attempt_repository;
mod postgres_permission_repository;
mod postgres_site_repository;
mod postgres_task_repository;
mod postgres_token_repository;
mod postgres_user_repository;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_task_repository::InMemoryTaskRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_denied_attempt_repository::PostgresDeniedAttemptRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_site_repository::PostgresSiteRepository;
pub use postgres_task_repository::PostgresTaskRepository;
pub use postgres_token_repository::PostgresTokenRepository;
pub use postgres_user_repository::PostgresUserRepository;
