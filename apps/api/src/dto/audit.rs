use obratrack_application::{AuditLogEntry, DeniedAttemptEntry};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntryResponse {
    pub entry_id: String,
    pub user_id: String,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            entry_id: value.entry_id,
            user_id: value.user_id.to_string(),
            action: value.action,
            resource: value.resource,
            resource_id: value.resource_id,
            details: value.details,
            ip_address: value.ip_address,
            user_agent: value.user_agent,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeniedAttemptResponse {
    pub entry_id: String,
    pub user_id: String,
    pub resource: String,
    pub action: String,
    pub reason: String,
    pub detail: String,
    pub created_at: String,
}

impl From<DeniedAttemptEntry> for DeniedAttemptResponse {
    fn from(value: DeniedAttemptEntry) -> Self {
        Self {
            entry_id: value.entry_id,
            user_id: value.user_id.to_string(),
            resource: value.resource,
            action: value.action,
            reason: value.reason,
            detail: value.detail,
            created_at: value.created_at,
        }
    }
}
