use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Internship {
    pub id: i64,
    pub employer_id: i64,
    pub role: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub active: bool,
    pub details: Json<InternshipDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-form posting details shown on the expanded internship page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InternshipDetails {
    pub salary: Option<String>,
    pub tech_stack: Vec<String>,
    pub academic_requirements: Option<String>,
    pub expanded_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInternship {
    pub employer_id: i64,
    pub role: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub details: InternshipDetails,
}

#[derive(Debug, Clone, Default)]
pub struct InternshipChanges {
    pub role: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub details: Option<InternshipDetails>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInternshipRequest {
    #[validate(length(min = 1, max = 200))]
    pub role: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub details: InternshipDetails,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInternshipRequest {
    #[validate(length(min = 1, max = 200))]
    pub role: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub details: Option<InternshipDetails>,
}

impl From<UpdateInternshipRequest> for InternshipChanges {
    fn from(request: UpdateInternshipRequest) -> Self {
        Self {
            role: request.role,
            description: request.description,
            deadline: request.deadline,
            details: request.details,
        }
    }
}

/// Active internship joined with its employer's display fields.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InternshipListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub internship: Internship,
    pub employer_name: Option<String>,
    pub employer_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InternshipMessage {
    pub message: String,
    pub internship: Internship,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivationResponse {
    pub message: String,
    pub rejected_applications: usize,
}
