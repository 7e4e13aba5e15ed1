//! Site structure ports and service: projects, areas, equipment.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use obratrack_core::{AppError, AppResult, NonEmptyString};
use obratrack_domain::{
    Action, AreaId, AuditAction, AuthenticatedUser, Discipline, EquipmentId, ProjectId, Resource,
    Role, Sector,
};
use serde_json::json;

use crate::audit_service::{AuditEvent, AuditRecorder, ClientMeta};
use crate::authorization_service::AuthorizationService;

/// Project row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Soft-disable flag.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Area row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRecord {
    /// Unique area identifier.
    pub id: AreaId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Area name.
    pub name: String,
}

/// Equipment row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRecord {
    /// Unique equipment identifier.
    pub id: EquipmentId,
    /// Owning area.
    pub area_id: AreaId,
    /// Equipment tag shown on drawings and in the field.
    pub tag: String,
    /// Engineering discipline.
    pub discipline: Discipline,
    /// Sector owning this equipment; tasks inherit it.
    pub sector: Sector,
}

/// Repository port for the project / area / equipment hierarchy.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// Creates a project.
    async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<ProjectRecord>;

    /// Lists all projects.
    async fn list_projects(&self) -> AppResult<Vec<ProjectRecord>>;

    /// Finds one project.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<ProjectRecord>>;

    /// Updates a project's name, description and active flag.
    async fn update_project(&self, project: ProjectRecord) -> AppResult<ProjectRecord>;

    /// Creates an area under a project.
    async fn create_area(&self, project_id: ProjectId, name: &str) -> AppResult<AreaRecord>;

    /// Lists areas of a project.
    async fn list_areas(&self, project_id: ProjectId) -> AppResult<Vec<AreaRecord>>;

    /// Registers equipment in an area.
    async fn create_equipment(
        &self,
        area_id: AreaId,
        tag: &str,
        discipline: Discipline,
        sector: Sector,
    ) -> AppResult<EquipmentRecord>;

    /// Lists equipment of an area, optionally restricted to one sector.
    async fn list_equipment(
        &self,
        area_id: AreaId,
        sector: Option<&Sector>,
    ) -> AppResult<Vec<EquipmentRecord>>;

    /// Finds one piece of equipment.
    async fn find_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Option<EquipmentRecord>>;
}

/// Input for project creation.
#[derive(Debug, Clone)]
pub struct CreateProjectParams {
    /// Project name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Client metadata for the audit trail.
    pub client: ClientMeta,
}

/// Input for equipment registration.
#[derive(Debug, Clone)]
pub struct CreateEquipmentParams {
    /// Owning area.
    pub area_id: AreaId,
    /// Equipment tag.
    pub tag: String,
    /// Engineering discipline.
    pub discipline: Discipline,
    /// Owning sector.
    pub sector: Sector,
    /// Client metadata for the audit trail.
    pub client: ClientMeta,
}

/// Application service for the site structure.
#[derive(Clone)]
pub struct SiteService {
    repository: Arc<dyn SiteRepository>,
    authorization: AuthorizationService,
    audit: AuditRecorder,
}

impl SiteService {
    /// Creates the site service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn SiteRepository>,
        authorization: AuthorizationService,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            repository,
            authorization,
            audit,
        }
    }

    /// Creates a project.
    pub async fn create_project(
        &self,
        actor: &AuthenticatedUser,
        params: CreateProjectParams,
    ) -> AppResult<ProjectRecord> {
        self.authorization
            .authorize(actor, Resource::Projects, Action::Create, None)
            .await?;

        let name = NonEmptyString::new(params.name)?;
        let project = self
            .repository
            .create_project(name.as_str(), params.description.as_deref())
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::ProjectCreated,
            resource: Resource::Projects,
            resource_id: Some(project.id.to_string()),
            details: Some(json!({ "name": project.name })),
            client: params.client,
        });

        Ok(project)
    }

    /// Lists projects visible to the actor.
    pub async fn list_projects(&self, actor: &AuthenticatedUser) -> AppResult<Vec<ProjectRecord>> {
        self.authorization
            .authorize(actor, Resource::Projects, Action::Read, None)
            .await?;

        let projects = self.repository.list_projects().await?;

        // Project-scoped users only see their own project.
        Ok(match actor.project_id() {
            Some(project_id) if actor.role() != Role::Admin => projects
                .into_iter()
                .filter(|project| project.id == project_id)
                .collect(),
            _ => projects,
        })
    }

    /// Updates a project's name, description and active flag.
    pub async fn update_project(
        &self,
        actor: &AuthenticatedUser,
        project_id: ProjectId,
        name: String,
        description: Option<String>,
        active: bool,
        client: ClientMeta,
    ) -> AppResult<ProjectRecord> {
        self.authorization
            .authorize(actor, Resource::Projects, Action::Update, None)
            .await?;

        let existing = self
            .repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{project_id}' does not exist")))?;

        let name = NonEmptyString::new(name)?;
        let updated = self
            .repository
            .update_project(ProjectRecord {
                id: existing.id,
                name: name.as_str().to_owned(),
                description,
                active,
                created_at: existing.created_at,
            })
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::ProjectUpdated,
            resource: Resource::Projects,
            resource_id: Some(project_id.to_string()),
            details: Some(json!({
                "before": { "name": existing.name, "active": existing.active },
                "after": { "name": updated.name, "active": updated.active },
            })),
            client,
        });

        Ok(updated)
    }

    /// Creates an area under a project.
    pub async fn create_area(
        &self,
        actor: &AuthenticatedUser,
        project_id: ProjectId,
        name: String,
        client: ClientMeta,
    ) -> AppResult<AreaRecord> {
        self.authorization
            .authorize(actor, Resource::Areas, Action::Create, None)
            .await?;

        self.repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{project_id}' does not exist")))?;

        let name = NonEmptyString::new(name)?;
        let area = self.repository.create_area(project_id, name.as_str()).await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::AreaCreated,
            resource: Resource::Areas,
            resource_id: Some(area.id.to_string()),
            details: Some(json!({ "project_id": project_id.to_string(), "name": area.name })),
            client,
        });

        Ok(area)
    }

    /// Lists areas of a project.
    pub async fn list_areas(
        &self,
        actor: &AuthenticatedUser,
        project_id: ProjectId,
    ) -> AppResult<Vec<AreaRecord>> {
        self.authorization
            .authorize(actor, Resource::Areas, Action::Read, None)
            .await?;

        self.repository.list_areas(project_id).await
    }

    /// Registers equipment in an area.
    pub async fn create_equipment(
        &self,
        actor: &AuthenticatedUser,
        params: CreateEquipmentParams,
    ) -> AppResult<EquipmentRecord> {
        self.authorization
            .authorize(
                actor,
                Resource::Equipment,
                Action::Create,
                Some(&params.sector),
            )
            .await?;

        let tag = NonEmptyString::new(params.tag)?;
        let equipment = self
            .repository
            .create_equipment(params.area_id, tag.as_str(), params.discipline, params.sector)
            .await?;

        self.audit.record(AuditEvent {
            user_id: actor.id(),
            action: AuditAction::EquipmentCreated,
            resource: Resource::Equipment,
            resource_id: Some(equipment.id.to_string()),
            details: Some(json!({
                "tag": equipment.tag,
                "sector": equipment.sector.as_str(),
                "discipline": equipment.discipline.as_str(),
            })),
            client: params.client,
        });

        Ok(equipment)
    }

    /// Lists equipment of an area, scoped to the actor's sector.
    ///
    /// Admins, supervisors and `all`-scoped users see every sector; other
    /// roles only see equipment in their own.
    pub async fn list_equipment(
        &self,
        actor: &AuthenticatedUser,
        area_id: AreaId,
    ) -> AppResult<Vec<EquipmentRecord>> {
        self.authorization
            .authorize(actor, Resource::Equipment, Action::Read, None)
            .await?;

        let sector_filter = match actor.role() {
            Role::Admin | Role::Supervisor => None,
            _ if actor.sector().is_all() => None,
            _ => Some(actor.sector().clone()),
        };

        self.repository
            .list_equipment(area_id, sector_filter.as_ref())
            .await
    }

    /// Finds one piece of equipment, enforcing sector-scoped read access.
    pub async fn get_equipment(
        &self,
        actor: &AuthenticatedUser,
        equipment_id: EquipmentId,
    ) -> AppResult<EquipmentRecord> {
        let equipment = self
            .repository
            .find_equipment(equipment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("equipment '{equipment_id}' does not exist"))
            })?;

        self.authorization
            .authorize(
                actor,
                Resource::Equipment,
                Action::Read,
                Some(&equipment.sector),
            )
            .await?;

        Ok(equipment)
    }
}
