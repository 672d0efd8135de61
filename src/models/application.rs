use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub internship_id: i64,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status")]
pub enum ApplicationStatus {
    Applied,
    #[serde(rename = "Interview Scheduled")]
    #[sqlx(rename = "Interview Scheduled")]
    InterviewScheduled,
    #[serde(rename = "Offer Given")]
    #[sqlx(rename = "Offer Given")]
    OfferGiven,
    Rejected,
    Withdrawn,
    Accepted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::OfferGiven,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
        ApplicationStatus::Accepted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::OfferGiven => "Offer Given",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
            ApplicationStatus::Accepted => "Accepted",
        }
    }

    /// No transition may leave a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Triage rank used by the employer pipeline view; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            ApplicationStatus::Accepted => 0,
            ApplicationStatus::OfferGiven => 1,
            ApplicationStatus::InterviewScheduled => 2,
            ApplicationStatus::Applied => 3,
            ApplicationStatus::Rejected => 4,
            ApplicationStatus::Withdrawn => 5,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let status = match normalized.as_str() {
            "applied" => ApplicationStatus::Applied,
            "interview scheduled" => ApplicationStatus::InterviewScheduled,
            "offer given" => ApplicationStatus::OfferGiven,
            "rejected" => ApplicationStatus::Rejected,
            "withdrawn" | "cancelled" | "canceled" => ApplicationStatus::Withdrawn,
            "accepted" => ApplicationStatus::Accepted,
            _ => return Err(UnknownStatus(raw.to_string())),
        };
        Ok(status)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    #[validate(range(min = 1))]
    pub student_id: i64,
    #[validate(range(min = 1))]
    pub internship_id: i64,
}

/// Status arrives as free text so unknown values surface as validation errors.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ApplicationMessage {
    pub message: String,
    pub application: Application,
}

/// Joined row backing the student's own application list.
#[derive(Debug, Clone, FromRow)]
pub struct StudentApplicationRow {
    pub id: i64,
    pub status: ApplicationStatus,
    pub internship_id: i64,
    pub role: Option<String>,
    pub internship_active: Option<bool>,
    pub employer_name: Option<String>,
}

/// Joined row backing the employer pipeline view.
#[derive(Debug, Clone, FromRow)]
pub struct EmployerApplicationRow {
    pub id: i64,
    pub student_id: i64,
    pub student_name: Option<String>,
    pub role: Option<String>,
    pub status: ApplicationStatus,
    pub internship_id: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StudentApplicationView {
    pub id: i64,
    pub role: String,
    pub employer: String,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployerApplicationView {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub internship_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_labels_and_legacy_aliases() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.label().parse::<ApplicationStatus>(), Ok(status));
        }
        assert_eq!(
            "interview_scheduled".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::InterviewScheduled)
        );
        assert_eq!(
            "OFFER GIVEN".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::OfferGiven)
        );
        assert_eq!(
            "Cancelled".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Withdrawn)
        );
        assert!("Hired".parse::<ApplicationStatus>().is_err());
        assert!("".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn terminal_states_are_exactly_accepted_rejected_withdrawn() {
        let terminal: Vec<_> = ApplicationStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                ApplicationStatus::Rejected,
                ApplicationStatus::Withdrawn,
                ApplicationStatus::Accepted
            ]
        );
    }

    #[test]
    fn serializes_with_spaced_labels() {
        let json = serde_json::to_string(&ApplicationStatus::InterviewScheduled).unwrap();
        assert_eq!(json, "\"Interview Scheduled\"");
        let back: ApplicationStatus = serde_json::from_str("\"Offer Given\"").unwrap();
        assert_eq!(back, ApplicationStatus::OfferGiven);
    }
}
