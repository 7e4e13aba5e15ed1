use std::str::FromStr;

use obratrack_core::AppError;
use serde::{Deserialize, Serialize};

/// Resource tags forming one dimension of the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Construction projects.
    Projects,
    /// Areas within a project.
    Areas,
    /// Equipment installed in an area.
    Equipment,
    /// Trackable tasks attached to equipment.
    Tasks,
    /// Task progress history entries.
    TaskHistory,
    /// User accounts.
    Users,
    /// The audit log itself.
    AuditLog,
}

impl Resource {
    /// Returns the stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Areas => "areas",
            Self::Equipment => "equipment",
            Self::Tasks => "tasks",
            Self::TaskHistory => "task_history",
            Self::Users => "users",
            Self::AuditLog => "audit_log",
        }
    }

    /// Returns all known resources.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Resource] = &[
            Resource::Projects,
            Resource::Areas,
            Resource::Equipment,
            Resource::Tasks,
            Resource::TaskHistory,
            Resource::Users,
            Resource::AuditLog,
        ];

        ALL
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "projects" => Ok(Self::Projects),
            "areas" => Ok(Self::Areas),
            "equipment" => Ok(Self::Equipment),
            "tasks" => Ok(Self::Tasks),
            "task_history" => Ok(Self::TaskHistory),
            "users" => Ok(Self::Users),
            "audit_log" => Ok(Self::AuditLog),
            _ => Err(AppError::Validation(format!(
                "unknown resource value '{value}'"
            ))),
        }
    }
}

/// Action tags forming the other dimension of the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read or list a resource.
    Read,
    /// Create a new resource.
    Create,
    /// Update an existing resource.
    Update,
    /// Delete a resource.
    Delete,
}

impl Action {
    /// Returns the stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];

        ALL
    }

    /// Returns whether this action changes state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown action value '{value}'"
            ))),
        }
    }
}

/// Returns the derived permission name in `resource.action` form.
#[must_use]
pub fn permission_name(resource: Resource, action: Action) -> String {
    format!("{}.{}", resource.as_str(), action.as_str())
}

/// Stable audit actions emitted after successful mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a project is created.
    ProjectCreated,
    /// Emitted when a project is updated.
    ProjectUpdated,
    /// Emitted when an area is created.
    AreaCreated,
    /// Emitted when a piece of equipment is registered.
    EquipmentCreated,
    /// Emitted when a task is created.
    TaskCreated,
    /// Emitted when an untouched task is deleted.
    TaskDeleted,
    /// Emitted when a progress history entry is appended.
    TaskProgressAppended,
    /// Emitted when a history entry (and its photos) is deleted.
    TaskHistoryEntryDeleted,
    /// Emitted when a user account is created.
    UserCreated,
    /// Emitted when a user's role or sector changes.
    UserUpdated,
    /// Emitted when a user's active flag is toggled.
    UserActivationChanged,
}

impl AuditAction {
    /// Returns the stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "projects.created",
            Self::ProjectUpdated => "projects.updated",
            Self::AreaCreated => "areas.created",
            Self::EquipmentCreated => "equipment.created",
            Self::TaskCreated => "tasks.created",
            Self::TaskDeleted => "tasks.deleted",
            Self::TaskProgressAppended => "tasks.progress_appended",
            Self::TaskHistoryEntryDeleted => "task_history.deleted",
            Self::UserCreated => "users.created",
            Self::UserUpdated => "users.updated",
            Self::UserActivationChanged => "users.activation_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Action, Resource, permission_name};

    #[test]
    fn resource_roundtrip_storage_value() {
        for resource in Resource::all() {
            let restored = Resource::from_str(resource.as_str());
            assert_eq!(restored.ok(), Some(*resource));
        }
    }

    #[test]
    fn action_roundtrip_storage_value() {
        for action in Action::all() {
            let restored = Action::from_str(action.as_str());
            assert_eq!(restored.ok(), Some(*action));
        }
    }

    #[test]
    fn unknown_resource_is_rejected() {
        assert!(Resource::from_str("vehicles").is_err());
    }

    #[test]
    fn read_is_not_mutating() {
        assert!(!Action::Read.is_mutating());
        assert!(Action::Create.is_mutating());
        assert!(Action::Update.is_mutating());
        assert!(Action::Delete.is_mutating());
    }

    #[test]
    fn permission_name_is_dotted_pair() {
        assert_eq!(
            permission_name(Resource::Tasks, Action::Delete),
            "tasks.delete"
        );
    }
}
