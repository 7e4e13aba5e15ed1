use obratrack_application::{
    AuditLogService, IdentityService, ProgressService, SiteService, TaskService, UserAdminService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity_service: IdentityService,
    pub site_service: SiteService,
    pub task_service: TaskService,
    pub progress_service: ProgressService,
    pub user_admin_service: UserAdminService,
    pub audit_log_service: AuditLogService,
}
