//! Central authorization evaluator.
//!
//! Every handler funnels through [`AuthorizationService::authorize`] (or the
//! task-deletion variant) instead of inlining role/sector conditionals. The
//! decision itself is the pure [`evaluate`] function over plain values; the
//! service adds the denied-attempt recording side effect for mutations.

use std::sync::Arc;

use obratrack_core::{AppError, AppResult};
use obratrack_domain::{
    Action, AuthenticatedUser, Progress, Resource, Role, Sector, check_task_deletable,
    permission_name,
};
use tracing::warn;

use crate::audit_service::{DenialReason, DeniedAttempt, DeniedAttemptRepository};
use crate::permission_table::PermissionTable;

/// Decides whether `user` may perform `action` on `resource`.
///
/// Evaluation order, role hierarchy first, then sector scoping, then the
/// grant table:
///
/// 1. Admins are allowed unconditionally.
/// 2. Supervisors with the unrestricted sector are allowed unconditionally
///    (the owning-project boundary is enforced by query filtering).
/// 3. Reads are sector-gated for every role except supervisor: a named
///    resource sector must be covered by the user's scope. Supervisors may
///    always observe across sectors.
/// 4. Mutations are sector-gated for everyone left: the user's scope must
///    cover the resource sector.
/// 5. What survives the gates falls through to the grant table; absent
///    triples are denied.
pub fn evaluate(
    table: &PermissionTable,
    user: &AuthenticatedUser,
    resource: Resource,
    action: Action,
    resource_sector: Option<&Sector>,
) -> AppResult<()> {
    if user.role() == Role::Admin {
        return Ok(());
    }

    if user.role() == Role::Supervisor && user.sector().is_all() {
        return Ok(());
    }

    if let Some(sector) = resource_sector {
        let covered = user.sector().covers(sector);
        let supervisor_read = action == Action::Read && user.role() == Role::Supervisor;

        if !covered && !supervisor_read {
            return Err(AppError::SectorMismatch(format!(
                "sector '{}' does not cover resource sector '{sector}'",
                user.sector()
            )));
        }
    }

    if table.is_granted(user.role(), resource, action) {
        return Ok(());
    }

    Err(AppError::NoPermission(format!(
        "role '{}' is not granted '{}'",
        user.role().as_str(),
        permission_name(resource, action)
    )))
}

/// Application service wrapping [`evaluate`] with denied-attempt recording.
#[derive(Clone)]
pub struct AuthorizationService {
    table: Arc<PermissionTable>,
    denied_attempts: Arc<dyn DeniedAttemptRepository>,
}

impl AuthorizationService {
    /// Creates the service from a loaded table and the denial sink.
    #[must_use]
    pub fn new(
        table: Arc<PermissionTable>,
        denied_attempts: Arc<dyn DeniedAttemptRepository>,
    ) -> Self {
        Self {
            table,
            denied_attempts,
        }
    }

    /// Authorizes one action, recording denied mutating attempts.
    ///
    /// Read denials are not recorded; only mutation attempts are interesting
    /// for audit visibility.
    pub async fn authorize(
        &self,
        user: &AuthenticatedUser,
        resource: Resource,
        action: Action,
        resource_sector: Option<&Sector>,
    ) -> AppResult<()> {
        match evaluate(&self.table, user, resource, action, resource_sector) {
            Ok(()) => Ok(()),
            Err(error) => {
                if action.is_mutating() {
                    self.record_denial(user, resource, action, &error).await;
                }
                Err(error)
            }
        }
    }

    /// Authorizes a task deletion.
    ///
    /// Tasks carry their own deletion rule: the sector gate applies as for
    /// any mutation, after which the progress/history guard and the
    /// template/custom role rule decide. The guard binds every role, admin
    /// included; an admin can bypass sector scoping but never delete a task
    /// that has recorded progress or history.
    pub async fn authorize_task_delete(
        &self,
        user: &AuthenticatedUser,
        task_sector: &Sector,
        is_custom: bool,
        current_progress: Progress,
        has_history: bool,
    ) -> AppResult<()> {
        let sector_bypass = user.role() == Role::Admin
            || (user.role() == Role::Supervisor && user.sector().is_all());

        if !sector_bypass && !user.sector().covers(task_sector) {
            let error = AppError::SectorMismatch(format!(
                "sector '{}' does not cover task sector '{task_sector}'",
                user.sector()
            ));
            self.record_denial(user, Resource::Tasks, Action::Delete, &error)
                .await;
            return Err(error);
        }

        if let Err(error) =
            check_task_deletable(user.role(), is_custom, current_progress, has_history)
        {
            self.record_denial(user, Resource::Tasks, Action::Delete, &error)
                .await;
            return Err(error);
        }

        Ok(())
    }

    async fn record_denial(
        &self,
        user: &AuthenticatedUser,
        resource: Resource,
        action: Action,
        error: &AppError,
    ) {
        let reason = match error {
            AppError::SectorMismatch(_) => DenialReason::SectorMismatch,
            AppError::NonDeletableResource(_) => DenialReason::NonDeletable,
            _ => DenialReason::NoPermission,
        };

        let attempt = DeniedAttempt {
            user_id: user.id(),
            resource,
            action,
            reason,
            detail: error.to_string(),
        };

        if let Err(record_error) = self.denied_attempts.append_attempt(attempt).await {
            warn!(%record_error, "failed to record denied attempt");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use obratrack_core::{AppError, AppResult};
    use obratrack_domain::{
        Action, AuthenticatedUser, Progress, Resource, Role, Sector, UserId,
    };
    use tokio::sync::Mutex;

    use crate::audit_service::{DeniedAttempt, DeniedAttemptEntry, DeniedAttemptRepository};
    use crate::permission_table::{PermissionGrant, PermissionTable};

    use super::{AuthorizationService, evaluate};

    #[derive(Default)]
    struct FakeDeniedAttemptRepository {
        attempts: Mutex<Vec<DeniedAttempt>>,
    }

    #[async_trait]
    impl DeniedAttemptRepository for FakeDeniedAttemptRepository {
        async fn append_attempt(&self, attempt: DeniedAttempt) -> AppResult<()> {
            self.attempts.lock().await.push(attempt);
            Ok(())
        }

        async fn list_recent_attempts(
            &self,
            _limit: usize,
            _offset: usize,
        ) -> AppResult<Vec<DeniedAttemptEntry>> {
            Ok(Vec::new())
        }
    }

    fn user(role: Role, sector: &str) -> AuthenticatedUser {
        let sector = match Sector::parse(sector) {
            Ok(value) => value,
            Err(_) => panic!("test"),
        };
        AuthenticatedUser::new(UserId::new(), "test user", role, sector, None)
    }

    fn sector(value: &str) -> Sector {
        match Sector::parse(value) {
            Ok(parsed) => parsed,
            Err(_) => panic!("test"),
        }
    }

    fn table_with(grants: &[(Role, Resource, Action)]) -> PermissionTable {
        PermissionTable::from_grants(
            grants
                .iter()
                .map(|(role, resource, action)| PermissionGrant {
                    role: *role,
                    resource: *resource,
                    action: *action,
                    granted: true,
                })
                .collect(),
        )
    }

    #[test]
    fn default_deny_holds_for_every_absent_triple() {
        let table = PermissionTable::from_grants(vec![]);

        for role in Role::all() {
            if *role == Role::Admin {
                continue;
            }
            let actor = user(*role, "electrical");
            for resource in Resource::all() {
                for action in Action::all() {
                    let result = evaluate(&table, &actor, *resource, *action, None);
                    assert!(
                        matches!(result, Err(AppError::NoPermission(_))),
                        "expected NoPermission for {role:?} {resource:?} {action:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn admin_bypass_is_total() {
        let table = PermissionTable::from_grants(vec![]);
        let admin = user(Role::Admin, "electrical");

        for resource in Resource::all() {
            for action in Action::all() {
                for resource_sector in [None, Some(sector("mechanical"))] {
                    let result =
                        evaluate(&table, &admin, *resource, *action, resource_sector.as_ref());
                    assert!(result.is_ok());
                }
            }
        }
    }

    #[test]
    fn global_supervisor_bypass_is_total() {
        let table = PermissionTable::from_grants(vec![]);
        let supervisor = user(Role::Supervisor, "all");

        let result = evaluate(
            &table,
            &supervisor,
            Resource::Tasks,
            Action::Delete,
            Some(&sector("mechanical")),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn scoped_supervisor_reads_across_sectors() {
        let table = table_with(&[(Role::Supervisor, Resource::Tasks, Action::Read)]);
        let supervisor = user(Role::Supervisor, "electrical");

        let result = evaluate(
            &table,
            &supervisor,
            Resource::Tasks,
            Action::Read,
            Some(&sector("mechanical")),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn scoped_supervisor_cannot_mutate_across_sectors() {
        let table = table_with(&[(Role::Supervisor, Resource::Tasks, Action::Update)]);
        let supervisor = user(Role::Supervisor, "electrical");

        let result = evaluate(
            &table,
            &supervisor,
            Resource::Tasks,
            Action::Update,
            Some(&sector("mechanical")),
        );
        assert!(matches!(result, Err(AppError::SectorMismatch(_))));
    }

    #[test]
    fn engineer_read_is_sector_gated() {
        let table = table_with(&[(Role::Engineer, Resource::Tasks, Action::Read)]);
        let engineer = user(Role::Engineer, "electrical");

        let in_sector = evaluate(
            &table,
            &engineer,
            Resource::Tasks,
            Action::Read,
            Some(&sector("electrical")),
        );
        assert!(in_sector.is_ok());

        let cross_sector = evaluate(
            &table,
            &engineer,
            Resource::Tasks,
            Action::Read,
            Some(&sector("mechanical")),
        );
        assert!(matches!(cross_sector, Err(AppError::SectorMismatch(_))));
    }

    #[test]
    fn sector_check_precedes_permission_table() {
        // No delete grant anywhere; the cross-sector engineer must still see
        // the sector denial, not the table fallthrough.
        let table = PermissionTable::from_grants(vec![]);
        let engineer = user(Role::Engineer, "electrical");

        let result = evaluate(
            &table,
            &engineer,
            Resource::Tasks,
            Action::Delete,
            Some(&sector("mechanical")),
        );
        assert!(matches!(result, Err(AppError::SectorMismatch(_))));
    }

    #[test]
    fn unscoped_resource_still_requires_grant() {
        let table = PermissionTable::from_grants(vec![]);
        let viewer = user(Role::Viewer, "all");

        let result = evaluate(&table, &viewer, Resource::AuditLog, Action::Read, None);
        assert!(matches!(result, Err(AppError::NoPermission(_))));
    }

    #[tokio::test]
    async fn denied_mutation_is_recorded() {
        let denied = Arc::new(FakeDeniedAttemptRepository::default());
        let service = AuthorizationService::new(
            Arc::new(PermissionTable::from_grants(vec![])),
            denied.clone(),
        );
        let engineer = user(Role::Engineer, "electrical");

        let result = service
            .authorize(
                &engineer,
                Resource::Tasks,
                Action::Update,
                Some(&sector("mechanical")),
            )
            .await;
        assert!(result.is_err());

        let attempts = denied.attempts.lock().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].action, Action::Update);
    }

    #[tokio::test]
    async fn denied_read_is_not_recorded() {
        let denied = Arc::new(FakeDeniedAttemptRepository::default());
        let service = AuthorizationService::new(
            Arc::new(PermissionTable::from_grants(vec![])),
            denied.clone(),
        );
        let viewer = user(Role::Viewer, "electrical");

        let result = service
            .authorize(&viewer, Resource::AuditLog, Action::Read, None)
            .await;
        assert!(result.is_err());

        let attempts = denied.attempts.lock().await;
        assert!(attempts.is_empty());
    }

    #[tokio::test]
    async fn task_delete_matrix_matches_policy() {
        let denied = Arc::new(FakeDeniedAttemptRepository::default());
        let service = AuthorizationService::new(
            Arc::new(PermissionTable::from_grants(vec![])),
            denied,
        );
        let electrical = sector("electrical");

        // Untouched template task: admin only.
        let admin = user(Role::Admin, "all");
        assert!(
            service
                .authorize_task_delete(&admin, &electrical, false, Progress::ZERO, false)
                .await
                .is_ok()
        );

        let supervisor = user(Role::Supervisor, "electrical");
        assert!(matches!(
            service
                .authorize_task_delete(&supervisor, &electrical, false, Progress::ZERO, false)
                .await,
            Err(AppError::NonDeletableResource(_))
        ));

        // Untouched custom task: supervisor allowed in sector.
        assert!(
            service
                .authorize_task_delete(&supervisor, &electrical, true, Progress::ZERO, false)
                .await
                .is_ok()
        );

        // Progressed task: blocked for everyone, admin included.
        let progressed = match Progress::new(30) {
            Ok(value) => value,
            Err(_) => panic!("test"),
        };
        assert!(matches!(
            service
                .authorize_task_delete(&admin, &electrical, true, progressed, false)
                .await,
            Err(AppError::NonDeletableResource(_))
        ));

        // History present: blocked for everyone.
        assert!(matches!(
            service
                .authorize_task_delete(&admin, &electrical, true, Progress::ZERO, true)
                .await,
            Err(AppError::NonDeletableResource(_))
        ));
    }

    #[tokio::test]
    async fn cross_sector_task_delete_is_sector_mismatch() {
        let denied = Arc::new(FakeDeniedAttemptRepository::default());
        let service = AuthorizationService::new(
            Arc::new(PermissionTable::from_grants(vec![])),
            denied.clone(),
        );
        let engineer = user(Role::Engineer, "electrical");

        let result = service
            .authorize_task_delete(&engineer, &sector("mechanical"), true, Progress::ZERO, false)
            .await;
        assert!(matches!(result, Err(AppError::SectorMismatch(_))));

        let attempts = denied.attempts.lock().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].reason.as_str(), "sector_mismatch");
    }
}
