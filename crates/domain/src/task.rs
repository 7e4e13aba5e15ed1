//! Task progress rules: percentage validation, status derivation, and the
//! deletion guard that protects the progress history trail.

use std::str::FromStr;

use obratrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Role;

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task identifier from an existing UUID value.
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

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated completion percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Progress(u8);

impl Progress {
    /// Zero percent.
    pub const ZERO: Self = Self(0);

    /// One hundred percent.
    pub const COMPLETE: Self = Self(100);

    /// Creates a validated progress percentage.
    pub fn new(value: i32) -> AppResult<Self> {
        u8::try_from(value)
            .ok()
            .filter(|percent| *percent <= 100)
            .map(Self)
            .ok_or_else(|| {
                AppError::InvalidProgress(format!(
                    "progress must be between 0 and 100, got {value}"
                ))
            })
    }

    /// Returns the percentage value.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}%", self.0)
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No progress recorded yet.
    Pending,
    /// Work has started but is not complete.
    InProgress,
    /// Progress reached 100%.
    Completed,
    /// Explicitly paused by an operator; cleared on the next progress write.
    OnHold,
}

impl TaskStatus {
    /// Returns the stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            _ => Err(AppError::Validation(format!(
                "unknown task status '{value}'"
            ))),
        }
    }
}

/// Derives the task status from a completion percentage.
///
/// Pure and deterministic: 0 is pending, 100 is completed, anything between
/// is in progress. Applied on every progress write, which is also what
/// clears an explicit on-hold override.
#[must_use]
pub fn derive_status(progress: Progress) -> TaskStatus {
    match progress.percent() {
        0 => TaskStatus::Pending,
        100 => TaskStatus::Completed,
        _ => TaskStatus::InProgress,
    }
}

/// Checks whether a task may be deleted by the given role.
///
/// A task with any recorded progress or history entry is not deletable by
/// anyone, so the progress trail stays intact. Untouched template-derived
/// tasks require admin; untouched custom tasks also allow supervisors.
pub fn check_task_deletable(
    role: Role,
    is_custom: bool,
    current_progress: Progress,
    has_history: bool,
) -> AppResult<()> {
    if current_progress > Progress::ZERO {
        return Err(AppError::NonDeletableResource(
            "task has recorded progress".to_owned(),
        ));
    }

    if has_history {
        return Err(AppError::NonDeletableResource(
            "task has progress history entries".to_owned(),
        ));
    }

    let role_eligible = match role {
        Role::Admin => true,
        Role::Supervisor => is_custom,
        _ => false,
    };

    if !role_eligible {
        let required = if is_custom {
            "admin or supervisor"
        } else {
            "admin"
        };
        return Err(AppError::NonDeletableResource(format!(
            "role '{}' may not delete this task; requires {required}",
            role.as_str()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn progress_bounds_are_enforced() {
        assert!(Progress::new(-1).is_err());
        assert!(Progress::new(101).is_err());
        assert!(Progress::new(0).is_ok());
        assert!(Progress::new(100).is_ok());
    }

    #[test]
    fn status_derivation_at_boundaries() {
        assert_eq!(derive_status(Progress::ZERO), TaskStatus::Pending);
        assert_eq!(derive_status(Progress::COMPLETE), TaskStatus::Completed);
        let mid = Progress::new(42);
        assert_eq!(mid.map(derive_status).ok(), Some(TaskStatus::InProgress));
    }

    #[test]
    fn status_roundtrip_storage_value() {
        for value in ["pending", "in_progress", "completed", "on_hold"] {
            let parsed = TaskStatus::from_str(value);
            assert_eq!(parsed.map(|s| s.as_str()).ok(), Some(value));
        }
    }

    #[test]
    fn untouched_template_task_deletable_by_admin_only() {
        assert!(check_task_deletable(Role::Admin, false, Progress::ZERO, false).is_ok());
        assert!(check_task_deletable(Role::Supervisor, false, Progress::ZERO, false).is_err());
        assert!(check_task_deletable(Role::Engineer, false, Progress::ZERO, false).is_err());
    }

    #[test]
    fn untouched_custom_task_also_deletable_by_supervisor() {
        assert!(check_task_deletable(Role::Supervisor, true, Progress::ZERO, false).is_ok());
        assert!(check_task_deletable(Role::Admin, true, Progress::ZERO, false).is_ok());
        assert!(check_task_deletable(Role::Engineer, true, Progress::ZERO, false).is_err());
    }

    #[test]
    fn progressed_task_is_never_deletable() {
        let progress = match Progress::new(10) {
            Ok(value) => value,
            Err(_) => panic!("test"),
        };

        for role in Role::all() {
            assert!(check_task_deletable(*role, true, progress, false).is_err());
            assert!(check_task_deletable(*role, false, progress, false).is_err());
        }
    }

    #[test]
    fn task_with_history_is_never_deletable() {
        for role in Role::all() {
            assert!(check_task_deletable(*role, true, Progress::ZERO, true).is_err());
        }
    }

    proptest! {
        #[test]
        fn derive_status_is_total_over_valid_range(value in 0i32..=100) {
            let progress = Progress::new(value);
            prop_assert!(progress.is_ok());
            if let Ok(progress) = progress {
                let status = derive_status(progress);
                match value {
                    0 => prop_assert_eq!(status, TaskStatus::Pending),
                    100 => prop_assert_eq!(status, TaskStatus::Completed),
                    _ => prop_assert_eq!(status, TaskStatus::InProgress),
                }
            }
        }

        #[test]
        fn derive_status_never_yields_on_hold(value in 0i32..=100) {
            if let Ok(progress) = Progress::new(value) {
                prop_assert_ne!(derive_status(progress), TaskStatus::OnHold);
            }
        }

        #[test]
        fn out_of_range_progress_is_rejected(value in prop::num::i32::ANY) {
            prop_assume!(!(0..=100).contains(&value));
            prop_assert!(Progress::new(value).is_err());
        }
    }
}
