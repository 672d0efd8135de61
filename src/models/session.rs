use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Employer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Employer => "employer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "student" => Some(Role::Student),
            "employer" => Some(Role::Employer),
            _ => None,
        }
    }
}

/// Authenticated caller, attached to the request by the auth middleware and
/// handed explicitly to every service call that needs authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerContext {
    Student { id: i64 },
    Employer { id: i64 },
}

impl CallerContext {
    pub fn role(&self) -> Role {
        match self {
            CallerContext::Student { .. } => Role::Student,
            CallerContext::Employer { .. } => Role::Employer,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            CallerContext::Student { id } | CallerContext::Employer { id } => *id,
        }
    }

    pub fn is_student(&self, student_id: i64) -> bool {
        matches!(self, CallerContext::Student { id } if *id == student_id)
    }

    pub fn is_employer(&self, employer_id: i64) -> bool {
        matches!(self, CallerContext::Employer { id } if *id == employer_id)
    }
}

/// Profile returned by the external identity provider after the OAuth exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub display_name: String,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
}
