use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const MAX_DOCUMENTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub institution_id: Option<String>,
    pub photo_url: Option<String>,
    /// Ordered references; the first one is the résumé.
    pub documents: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub institution_id: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub institution_id: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
}

impl From<StudentProfileRequest> for StudentChanges {
    fn from(request: StudentProfileRequest) -> Self {
        Self {
            name: request.name,
            phone: request.phone,
            address: request.address,
            institution_id: request.institution_id,
            photo_url: request.photo_url,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StudentDocumentsRequest {
    #[validate(length(min = 1, max = 3))]
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StudentMessage {
    pub message: String,
    pub student: Student,
}
