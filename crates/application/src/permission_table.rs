//! Static role/resource/action grant table loaded once at startup.

use std::collections::HashSet;

use async_trait::async_trait;
use obratrack_core::AppResult;
use obratrack_domain::{Action, Resource, Role};

/// One granted capability row from persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGrant {
    /// Role holding the grant.
    pub role: Role,
    /// Resource dimension of the capability.
    pub resource: Resource,
    /// Action dimension of the capability.
    pub action: Action,
    /// Whether the grant is active.
    pub granted: bool,
}

/// Repository port for loading the persisted grant matrix.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Loads every role/permission row.
    async fn load_grants(&self) -> AppResult<Vec<PermissionGrant>>;
}

/// Immutable (role, resource, action) grant set.
///
/// Built once from the repository and shared read-only across request
/// handlers. Every triple not present is implicitly denied. Administrative
/// grant changes require a process restart.
#[derive(Debug, Default)]
pub struct PermissionTable {
    grants: HashSet<(Role, Resource, Action)>,
}

impl PermissionTable {
    /// Builds a table from loaded grant rows, ignoring revoked ones.
    #[must_use]
    pub fn from_grants(rows: Vec<PermissionGrant>) -> Self {
        let grants = rows
            .into_iter()
            .filter(|row| row.granted)
            .map(|row| (row.role, row.resource, row.action))
            .collect();

        Self { grants }
    }

    /// Loads the table from the repository.
    pub async fn load(repository: &dyn PermissionRepository) -> AppResult<Self> {
        let rows = repository.load_grants().await?;
        Ok(Self::from_grants(rows))
    }

    /// Returns whether the role holds the (resource, action) capability.
    #[must_use]
    pub fn is_granted(&self, role: Role, resource: Resource, action: Action) -> bool {
        self.grants.contains(&(role, resource, action))
    }

    /// Returns the number of active grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Returns whether the table holds no grants at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use obratrack_domain::{Action, Resource, Role};

    use super::{PermissionGrant, PermissionTable};

    #[test]
    fn absent_triples_are_denied() {
        let table = PermissionTable::from_grants(vec![]);

        for role in Role::all() {
            for resource in Resource::all() {
                for action in Action::all() {
                    assert!(!table.is_granted(*role, *resource, *action));
                }
            }
        }
    }

    #[test]
    fn granted_triple_is_found() {
        let table = PermissionTable::from_grants(vec![PermissionGrant {
            role: Role::Engineer,
            resource: Resource::Tasks,
            action: Action::Update,
            granted: true,
        }]);

        assert!(table.is_granted(Role::Engineer, Resource::Tasks, Action::Update));
        assert!(!table.is_granted(Role::Engineer, Resource::Tasks, Action::Delete));
        assert!(!table.is_granted(Role::Operator, Resource::Tasks, Action::Update));
    }

    #[test]
    fn revoked_rows_are_excluded() {
        let table = PermissionTable::from_grants(vec![PermissionGrant {
            role: Role::Viewer,
            resource: Resource::Projects,
            action: Action::Read,
            granted: false,
        }]);

        assert!(!table.is_granted(Role::Viewer, Resource::Projects, Action::Read));
        assert!(table.is_empty());
    }
}
