//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_service;
mod authorization_service;
mod identity_service;
mod permission_table;
mod progress_service;
mod site_service;
mod task_ports;
mod task_service;
mod user_admin_service;

#[cfg(test)]
mod test_support;

pub use audit_service::{
    AuditDrain, AuditEvent, AuditLogEntry, AuditLogQuery, AuditLogRepository, AuditLogService,
    AuditRecorder, AuditRepository, ClientMeta, DenialReason, DeniedAttempt, DeniedAttemptEntry,
    DeniedAttemptRepository,
};
pub use authorization_service::{AuthorizationService, evaluate};
pub use identity_service::{
    AuthSession, IdentityService, NewUserRecord, PasswordHasher, TokenRepository, UserRecord,
    UserRepository,
};
pub use permission_table::{PermissionGrant, PermissionRepository, PermissionTable};
pub use progress_service::{AppendProgressParams, ProgressService};
pub use site_service::{
    AreaRecord, CreateEquipmentParams, CreateProjectParams, EquipmentRecord, ProjectRecord,
    SiteRepository, SiteService,
};
pub use task_ports::{
    AppendProgressInput, NewTaskRecord, PhotoRecord, PhotoUpload, TaskHistoryRecord, TaskRecord,
    TaskRepository,
};
pub use task_service::{CreateTaskParams, TaskService};
pub use user_admin_service::{CreateUserParams, UserAdminService};
