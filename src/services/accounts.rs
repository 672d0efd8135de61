//! Employer and student account flows: registration, sign-in, profiles and
//! password reset.

use bcrypt::{hash, verify};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    employer::{Employer, EmployerChanges, NewEmployer, RegisterEmployerRequest},
    session::{CallerContext, IdentityProfile, Role},
    student::{NewStudent, Student, StudentChanges, MAX_DOCUMENTS},
};
use crate::services::notification::NotificationService;
use crate::store::Store;
use crate::utils::{
    config::AppConfig,
    errors::AppError,
    identity::{derive_student_id, is_institutional_email},
    jwt::create_jwt,
    logger::{fields, LOGGER},
};

const INVALID_RESET_TOKEN: &str = "Invalid or expired password reset token";

pub struct EmployerAccounts {
    store: Arc<dyn Store>,
    notifications: NotificationService,
    config: Arc<AppConfig>,
}

impl EmployerAccounts {
    pub fn new(
        store: Arc<dyn Store>,
        notifications: NotificationService,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            notifications,
            config,
        }
    }

    pub async fn register(&self, request: RegisterEmployerRequest) -> Result<Employer, AppError> {
        if self
            .store
            .find_employer_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Employer with this email already exists".to_string(),
            ));
        }

        let password_hash = hash(&request.password, self.config.bcrypt_cost)
            .map_err(|_| AppError::InternalServerError("Failed to hash password".to_string()))?;

        let employer = self
            .store
            .create_employer(NewEmployer {
                name: request.name,
                email: request.email,
                password_hash,
                phone: request.phone,
                address: request.address,
            })
            .await?;

        LOGGER.log_business_event("employer_registered", Some(employer.id), fields([]));
        Ok(employer)
    }

    /// Returns a signed session token and the employer on valid credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, Employer), AppError> {
        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let employer = self
            .store
            .find_employer_by_email(email)
            .await?
            .ok_or_else(invalid)?;

        let is_valid = verify(password, &employer.password_hash)
            .map_err(|_| AppError::InternalServerError("Failed to verify password".to_string()))?;
        if !is_valid {
            return Err(invalid());
        }

        let token = create_jwt(
            employer.id,
            &employer.email,
            Role::Employer,
            &self.config.jwt_secret,
            self.config.token_ttl(),
        )
        .map_err(|_| AppError::InternalServerError("Failed to create token".to_string()))?;

        Ok((token, employer))
    }

    pub async fn profile(&self, caller: &CallerContext) -> Result<Employer, AppError> {
        let employer_id = employer_id(caller)?;
        self.store
            .find_employer(employer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employer not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        caller: &CallerContext,
        changes: EmployerChanges,
    ) -> Result<Employer, AppError> {
        let employer_id = employer_id(caller)?;
        self.store
            .update_employer(employer_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Employer not found".to_string()))
    }

    /// Deletes the employer account. Internships are not cascaded: the delete
    /// is refused while any posting still references the employer.
    pub async fn delete_profile(&self, caller: &CallerContext) -> Result<(), AppError> {
        let employer_id = employer_id(caller)?;
        if !self.store.delete_employer(employer_id).await? {
            return Err(AppError::NotFound("Employer not found".to_string()));
        }
        LOGGER.log_business_event("employer_deleted", Some(employer_id), fields([]));
        Ok(())
    }

    /// Issues a one-hour reset token and emails the reset link. Returns the
    /// plain token so callers other than HTTP (tests, tooling) can use it.
    pub async fn send_password_reset_email(&self, email: &str) -> Result<String, AppError> {
        let employer = self
            .store
            .find_employer_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Employer not found".to_string()))?;

        let reset_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let token_hash = hash(&reset_token, self.config.bcrypt_cost)
            .map_err(|_| AppError::InternalServerError("Failed to hash token".to_string()))?;
        let expires_at = Utc::now() + self.config.reset_token_ttl();

        self.store
            .set_reset_token(employer.id, Some(token_hash), Some(expires_at))
            .await?;

        let reset_url = reset_link(&self.config.frontend_url, &reset_token, &employer.email)?;
        let message = self.notifications.password_reset(&employer, &reset_url);
        self.notifications.deliver(message).await.map_err(|e| {
            tracing::error!(employer_id = employer.id, "password reset email failed: {}", e);
            AppError::InternalServerError("Failed to send password reset email".to_string())
        })?;

        Ok(reset_token)
    }

    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let employer = self
            .store
            .find_employer_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("Employer not found".to_string()))?;

        let (Some(token_hash), Some(expires_at)) =
            (&employer.reset_token_hash, employer.reset_token_expires_at)
        else {
            return Err(AppError::BadRequest(INVALID_RESET_TOKEN.to_string()));
        };

        let token_matches = verify(token, token_hash).unwrap_or(false);
        if !token_matches || Utc::now() > expires_at {
            return Err(AppError::BadRequest(INVALID_RESET_TOKEN.to_string()));
        }

        let password_hash = hash(new_password, self.config.bcrypt_cost)
            .map_err(|_| AppError::InternalServerError("Failed to hash password".to_string()))?;
        self.store
            .set_password_hash(employer.id, password_hash)
            .await?;

        LOGGER.log_business_event("employer_password_reset", Some(employer.id), fields([]));
        Ok(())
    }
}

fn employer_id(caller: &CallerContext) -> Result<i64, AppError> {
    match caller {
        CallerContext::Employer { id } => Ok(*id),
        CallerContext::Student { .. } => Err(AppError::Forbidden(
            "Employer account required".to_string(),
        )),
    }
}

fn student_id(caller: &CallerContext) -> Result<i64, AppError> {
    match caller {
        CallerContext::Student { id } => Ok(*id),
        CallerContext::Employer { .. } => Err(AppError::Forbidden(
            "Student account required".to_string(),
        )),
    }
}

fn reset_link(frontend_url: &str, token: &str, email: &str) -> Result<String, AppError> {
    let base = format!("{}/reset-password", frontend_url.trim_end_matches('/'));
    let url = reqwest::Url::parse_with_params(&base, &[("token", token), ("email", email)])
        .map_err(|_| AppError::InternalServerError("Invalid FRONTEND_URL".to_string()))?;
    Ok(url.to_string())
}

pub struct StudentAccounts {
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
}

impl StudentAccounts {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Signs a student in from an identity-provider profile, creating the
    /// identity mapping and profile on first login.
    pub async fn sign_in(&self, profile: &IdentityProfile) -> Result<(String, Student), AppError> {
        if !is_institutional_email(&profile.email, &self.config.student_email_domain) {
            return Err(AppError::Forbidden(format!(
                "Sign-in is restricted to @{} accounts",
                self.config.student_email_domain
            )));
        }

        let student = match self.store.student_id_for_email(&profile.email).await? {
            Some(id) => self
                .store
                .find_student(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?,
            None => self.first_login(profile).await?,
        };

        let token = create_jwt(
            student.id,
            &student.email,
            Role::Student,
            &self.config.jwt_secret,
            self.config.token_ttl(),
        )
        .map_err(|_| AppError::InternalServerError("Failed to create token".to_string()))?;

        LOGGER.log_business_event("student_signed_in", Some(student.id), fields([]));
        Ok((token, student))
    }

    async fn first_login(&self, profile: &IdentityProfile) -> Result<Student, AppError> {
        let id = derive_student_id(&self.config.student_id_prefix, &profile.email).ok_or_else(
            || AppError::invalid("email", "Institutional email does not contain a student number"),
        )?;

        if let Some(existing) = self.store.find_student(id).await? {
            if !existing.email.eq_ignore_ascii_case(&profile.email) {
                return Err(AppError::Conflict(
                    "Student number already belongs to another account".to_string(),
                ));
            }
            self.store.link_student_identity(&profile.email, id).await?;
            return Ok(existing);
        }

        let student = self
            .store
            .create_student(NewStudent {
                id,
                email: profile.email.clone(),
                name: profile.name.clone(),
                photo_url: profile.picture.clone(),
            })
            .await?;

        LOGGER.log_business_event(
            "student_created",
            Some(student.id),
            fields([("subject", Value::from(profile.subject.clone()))]),
        );
        Ok(student)
    }

    pub async fn profile(&self, caller: &CallerContext) -> Result<Student, AppError> {
        let id = student_id(caller)?;
        self.store
            .find_student(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    /// Upserts profile fields; profile completion and later edits share this.
    pub async fn update_profile(
        &self,
        caller: &CallerContext,
        changes: StudentChanges,
    ) -> Result<Student, AppError> {
        let id = student_id(caller)?;
        self.store
            .update_student(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    /// Profile completion requires every contact field the sign-in could not fill.
    pub async fn complete_profile(
        &self,
        caller: &CallerContext,
        changes: StudentChanges,
    ) -> Result<Student, AppError> {
        let current = self.profile(caller).await?;
        let mut missing = Vec::new();
        if changes.phone.is_none() && current.phone.is_none() {
            missing.push("phone");
        }
        if changes.address.is_none() && current.address.is_none() {
            missing.push("address");
        }
        if changes.institution_id.is_none() && current.institution_id.is_none() {
            missing.push("institutionId");
        }
        if !missing.is_empty() {
            let details = missing
                .into_iter()
                .map(|field| (field.to_string(), vec!["This field is required".to_string()]))
                .collect();
            return Err(AppError::ValidationError(details));
        }

        self.update_profile(caller, changes).await
    }

    /// Replaces the ordered document list; the first entry is the résumé.
    pub async fn set_documents(
        &self,
        caller: &CallerContext,
        documents: Vec<String>,
    ) -> Result<Student, AppError> {
        let id = student_id(caller)?;
        if documents.is_empty() || documents.len() > MAX_DOCUMENTS {
            return Err(AppError::invalid(
                "documents",
                format!("Between 1 and {} documents are required", MAX_DOCUMENTS),
            ));
        }
        if documents.iter().any(|doc| doc.trim().is_empty()) {
            return Err(AppError::invalid("documents", "Document references cannot be empty"));
        }

        self.store
            .set_student_documents(id, documents)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))
    }

    /// Deletes the student together with all of their applications.
    pub async fn delete(&self, caller: &CallerContext) -> Result<(), AppError> {
        let id = student_id(caller)?;
        if !self.store.delete_student(id).await? {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        LOGGER.log_business_event("student_deleted", Some(id), fields([]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_encodes_email() {
        let link = reset_link("http://localhost:5173/", "abc", "hr+jobs@acme.io").unwrap();
        assert_eq!(
            link,
            "http://localhost:5173/reset-password?token=abc&email=hr%2Bjobs%40acme.io"
        );
    }

    #[test]
    fn role_guards_reject_the_other_role() {
        assert!(employer_id(&CallerContext::Student { id: 1 }).is_err());
        assert!(student_id(&CallerContext::Employer { id: 1 }).is_err());
        assert_eq!(employer_id(&CallerContext::Employer { id: 4 }).unwrap(), 4);
    }
}
