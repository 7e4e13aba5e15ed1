use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use obratrack_application::{AreaRecord, EquipmentRecord, ProjectRecord, SiteRepository};
use obratrack_core::{AppError, AppResult};
use obratrack_domain::{AreaId, Discipline, EquipmentId, ProjectId, Sector};

/// PostgreSQL-backed repository for the project / area / equipment hierarchy.
#[derive(Clone)]
pub struct PostgresSiteRepository {
    pool: PgPool,
}

impl PostgresSiteRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AreaRow {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    name: String,
}

impl From<AreaRow> for AreaRecord {
    fn from(row: AreaRow) -> Self {
        Self {
            id: AreaId::from_uuid(row.id),
            project_id: ProjectId::from_uuid(row.project_id),
            name: row.name,
        }
    }
}

#[derive(Debug, FromRow)]
struct EquipmentRow {
    id: uuid::Uuid,
    area_id: uuid::Uuid,
    tag: String,
    discipline: String,
    sector: String,
}

impl TryFrom<EquipmentRow> for EquipmentRecord {
    type Error = AppError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        let discipline = Discipline::from_str(row.discipline.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode discipline '{}' for equipment '{}': {error}",
                row.discipline, row.id
            ))
        })?;
        let sector = Sector::parse(row.sector.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode sector '{}' for equipment '{}': {error}",
                row.sector, row.id
            ))
        })?;

        Ok(Self {
            id: EquipmentId::from_uuid(row.id),
            area_id: AreaId::from_uuid(row.area_id),
            tag: row.tag,
            discipline,
            sector,
        })
    }
}

#[async_trait]
impl SiteRepository for PostgresSiteRepository {
    async fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<ProjectRecord> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, active, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create project: {error}")))?;

        Ok(ProjectRecord::from(row))
    }

    async fn list_projects(&self) -> AppResult<Vec<ProjectRecord>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, active, created_at
            FROM projects
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list projects: {error}")))?;

        Ok(rows.into_iter().map(ProjectRecord::from).collect())
    }

    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, active, created_at
            FROM projects
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find project: {error}")))?;

        Ok(row.map(ProjectRecord::from))
    }

    async fn update_project(&self, project: ProjectRecord) -> AppResult<ProjectRecord> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE projects
            SET name = $2,
                description = $3,
                active = $4,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, active, created_at
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update project: {error}")))?
        .ok_or_else(|| {
            AppError::NotFound(format!("project '{}' does not exist", project.id))
        })?;

        Ok(ProjectRecord::from(row))
    }

    async fn create_area(&self, project_id: ProjectId, name: &str) -> AppResult<AreaRecord> {
        let row = sqlx::query_as::<_, AreaRow>(
            r#"
            INSERT INTO areas (project_id, name)
            VALUES ($1, $2)
            RETURNING id, project_id, name
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create area: {error}")))?;

        Ok(AreaRecord::from(row))
    }

    async fn list_areas(&self, project_id: ProjectId) -> AppResult<Vec<AreaRecord>> {
        let rows = sqlx::query_as::<_, AreaRow>(
            r#"
            SELECT id, project_id, name
            FROM areas
            WHERE project_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list areas: {error}")))?;

        Ok(rows.into_iter().map(AreaRecord::from).collect())
    }

    async fn create_equipment(
        &self,
        area_id: AreaId,
        tag: &str,
        discipline: Discipline,
        sector: Sector,
    ) -> AppResult<EquipmentRecord> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            INSERT INTO equipment (area_id, tag, discipline, sector)
            VALUES ($1, $2, $3, $4)
            RETURNING id, area_id, tag, discipline, sector
            "#,
        )
        .bind(area_id.as_uuid())
        .bind(tag)
        .bind(discipline.as_str())
        .bind(sector.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create equipment: {error}")))?;

        EquipmentRecord::try_from(row)
    }

    async fn list_equipment(
        &self,
        area_id: AreaId,
        sector: Option<&Sector>,
    ) -> AppResult<Vec<EquipmentRecord>> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT id, area_id, tag, discipline, sector
            FROM equipment
            WHERE area_id = $1
                AND ($2::TEXT IS NULL OR sector = $2)
            ORDER BY tag ASC
            "#,
        )
        .bind(area_id.as_uuid())
        .bind(sector.map(|value| value.as_str().to_owned()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list equipment: {error}")))?;

        rows.into_iter().map(EquipmentRecord::try_from).collect()
    }

    async fn find_equipment(
        &self,
        equipment_id: EquipmentId,
    ) -> AppResult<Option<EquipmentRecord>> {
        let row = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT id, area_id, tag, discipline, sector
            FROM equipment
            WHERE id = $1
            LIMIT 1
            "#,
        )
        .bind(equipment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find equipment: {error}")))?;

        row.map(EquipmentRecord::try_from).transpose()
    }
}
