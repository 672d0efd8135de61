//! Persistence boundary. Services only talk to [`Store`]; the Postgres adapter
//! backs production and the in-memory adapter backs tests and local runs.

use async_trait::async_trait;

use crate::models::{
    application::{Application, ApplicationStatus, EmployerApplicationRow, StudentApplicationRow},
    employer::{Employer, EmployerChanges, NewEmployer},
    internship::{Internship, InternshipChanges, InternshipListing, NewInternship},
    student::{NewStudent, Student, StudentChanges},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound("record"),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    StoreError::Conflict("Resource already exists".to_string())
                } else if db_err.is_foreign_key_violation() {
                    StoreError::Conflict("Resource is still referenced".to_string())
                } else {
                    StoreError::Unavailable(db_err.to_string())
                }
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Outcome of an internship soft-delete: the applications the cascade rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Deactivation {
    pub internship: Internship,
    pub rejected: Vec<Application>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // students
    async fn find_student(&self, id: i64) -> Result<Option<Student>, StoreError>;
    async fn student_id_for_email(&self, email: &str) -> Result<Option<i64>, StoreError>;
    /// Inserts the student and its identity mapping in one unit.
    async fn create_student(&self, student: NewStudent) -> Result<Student, StoreError>;
    /// Writes only the identity mapping for an already existing student.
    async fn link_student_identity(&self, email: &str, student_id: i64) -> Result<(), StoreError>;
    async fn update_student(
        &self,
        id: i64,
        changes: StudentChanges,
    ) -> Result<Option<Student>, StoreError>;
    async fn set_student_documents(
        &self,
        id: i64,
        documents: Vec<String>,
    ) -> Result<Option<Student>, StoreError>;
    /// Removes the student together with its applications and identity mapping.
    async fn delete_student(&self, id: i64) -> Result<bool, StoreError>;

    // employers
    async fn find_employer(&self, id: i64) -> Result<Option<Employer>, StoreError>;
    async fn find_employer_by_email(&self, email: &str) -> Result<Option<Employer>, StoreError>;
    async fn create_employer(&self, employer: NewEmployer) -> Result<Employer, StoreError>;
    async fn update_employer(
        &self,
        id: i64,
        changes: EmployerChanges,
    ) -> Result<Option<Employer>, StoreError>;
    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: Option<String>,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<(), StoreError>;
    /// Stores the new hash and clears any pending reset token.
    async fn set_password_hash(&self, id: i64, password_hash: String) -> Result<(), StoreError>;
    /// Refuses with `Conflict` while the employer still owns internships.
    async fn delete_employer(&self, id: i64) -> Result<bool, StoreError>;

    // internships
    async fn create_internship(&self, internship: NewInternship) -> Result<Internship, StoreError>;
    async fn update_internship(
        &self,
        id: i64,
        changes: InternshipChanges,
    ) -> Result<Option<Internship>, StoreError>;
    /// Any internship, active or not.
    async fn find_internship(&self, id: i64) -> Result<Option<Internship>, StoreError>;
    async fn list_active_internships(&self) -> Result<Vec<InternshipListing>, StoreError>;
    async fn list_active_internships_by_employer(
        &self,
        employer_id: i64,
    ) -> Result<Vec<Internship>, StoreError>;
    /// Flips `active` off and rejects every open application of the internship
    /// atomically. `None` when no active internship has this id.
    async fn deactivate_internship(&self, id: i64) -> Result<Option<Deactivation>, StoreError>;

    // applications
    /// Inserts an `Applied` application only while the internship is active;
    /// `NotFound` otherwise, even when it is deactivated concurrently.
    async fn create_application(
        &self,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Application, StoreError>;
    async fn find_application(&self, id: i64) -> Result<Option<Application>, StoreError>;
    async fn find_open_application(
        &self,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Option<Application>, StoreError>;
    /// Compare-and-set: writes `next` only while the stored status is still
    /// `expected`. `None` when the row is gone or its status moved on.
    async fn update_application_status(
        &self,
        id: i64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError>;
    async fn student_application_rows(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentApplicationRow>, StoreError>;
    async fn employer_application_rows(
        &self,
        employer_id: i64,
    ) -> Result<Vec<EmployerApplicationRow>, StoreError>;
}
