//! Identifiers and tags for the project / area / equipment hierarchy.

use std::str::FromStr;

use obratrack_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random project identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a project identifier from an existing UUID value.
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

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for an area within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaId(Uuid);

impl AreaId {
    /// Creates a new random area identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an area identifier from an existing UUID value.
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

impl Default for AreaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AreaId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentId(Uuid);

impl EquipmentId {
    /// Creates a new random equipment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an equipment identifier from an existing UUID value.
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

impl Default for EquipmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EquipmentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Engineering discipline of a task or piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Electrical installations.
    Electrical,
    /// Mechanical assembly.
    Mechanical,
    /// Civil works.
    Civil,
    /// Piping and tubing.
    Piping,
    /// Instrumentation and control.
    Instrumentation,
    /// Structural steelwork.
    Structural,
}

impl Discipline {
    /// Returns the stable storage value for this discipline.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "electrical",
            Self::Mechanical => "mechanical",
            Self::Civil => "civil",
            Self::Piping => "piping",
            Self::Instrumentation => "instrumentation",
            Self::Structural => "structural",
        }
    }
}

impl FromStr for Discipline {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "electrical" => Ok(Self::Electrical),
            "mechanical" => Ok(Self::Mechanical),
            "civil" => Ok(Self::Civil),
            "piping" => Ok(Self::Piping),
            "instrumentation" => Ok(Self::Instrumentation),
            "structural" => Ok(Self::Structural),
            _ => Err(AppError::Validation(format!(
                "unknown discipline '{value}'"
            ))),
        }
    }
}
