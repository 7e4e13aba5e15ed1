use obratrack_domain::AuthenticatedUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: String,
    pub name: String,
    pub role: String,
    pub sector: String,
    pub project_id: Option<String>,
}

impl From<AuthenticatedUser> for IdentityResponse {
    fn from(value: AuthenticatedUser) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().to_owned(),
            role: value.role().as_str().to_owned(),
            sector: value.sector().as_str().to_owned(),
            project_id: value.project_id().map(|project_id| project_id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: IdentityResponse,
}
