use obratrack_application::{AreaRecord, EquipmentRecord, ProjectRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: String,
}

impl From<ProjectRecord> for ProjectResponse {
    fn from(value: ProjectRecord) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            active: value.active,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAreaRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaResponse {
    pub id: String,
    pub project_id: String,
    pub name: String,
}

impl From<AreaRecord> for AreaResponse {
    fn from(value: AreaRecord) -> Self {
        Self {
            id: value.id.to_string(),
            project_id: value.project_id.to_string(),
            name: value.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipmentRequest {
    pub tag: String,
    pub discipline: String,
    pub sector: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentResponse {
    pub id: String,
    pub area_id: String,
    pub tag: String,
    pub discipline: String,
    pub sector: String,
}

impl From<EquipmentRecord> for EquipmentResponse {
    fn from(value: EquipmentRecord) -> Self {
        Self {
            id: value.id.to_string(),
            area_id: value.area_id.to_string(),
            tag: value.tag,
            discipline: value.discipline.as_str().to_owned(),
            sector: value.sector.as_str().to_owned(),
        }
    }
}
