use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An imam as the admin sees it, access code included.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Imam {
    pub id: i64,
    pub name: String,
    pub access_code: String,
    pub quota: i32,
    /// Number of days currently assigned, computed at read time.
    pub booked: i64,
    pub created_at: DateTime<Utc>,
}

/// Public profile: everything except the access code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImamProfile {
    pub id: i64,
    pub name: String,
    pub quota: i32,
    pub booked: i64,
}

impl From<Imam> for ImamProfile {
    fn from(imam: Imam) -> Self {
        Self {
            id: imam.id,
            name: imam.name,
            quota: imam.quota,
            booked: imam.booked,
        }
    }
}

/// Validated input for an insert. The access code is generated by the service.
#[derive(Debug, Clone)]
pub struct NewImam {
    pub name: String,
    pub access_code: String,
    pub quota: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateImamRequest {
    pub name: Option<String>,
    pub quota: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyAccessCodeRequest {
    pub access_code: Option<String>,
}
