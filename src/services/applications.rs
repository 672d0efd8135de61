//! Application lifecycle: creation, status transitions and the two pipeline views.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{
    application::{
        Application, ApplicationStatus, EmployerApplicationRow, EmployerApplicationView,
        StudentApplicationRow, StudentApplicationView, UnknownStatus,
    },
    session::CallerContext,
};
use crate::services::notification::NotificationService;
use crate::store::Store;
use crate::utils::{
    errors::AppError,
    logger::{fields, LOGGER},
};

const MISSING: &str = "N/A";

/// Why a caller may not request a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NotOwner,
    StudentMayOnlyWithdrawOrAcceptOffer,
}

impl Denial {
    pub fn message(self) -> &'static str {
        match self {
            Denial::NotOwner => "You may only change applications you own",
            Denial::StudentMayOnlyWithdrawOrAcceptOffer => {
                "Students may only withdraw, or accept an application with an offer"
            }
        }
    }
}

/// Who owns an application: the applying student and the posting employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub student_id: i64,
    pub employer_id: i64,
}

/// Authorization matrix for status changes.
///
/// Employers owning the posting may request any status. Students owning the
/// application may withdraw at any point or accept an outstanding offer.
/// Terminal-state conflicts are checked separately, after this.
pub fn authorize_transition(
    caller: &CallerContext,
    owner: Ownership,
    current: ApplicationStatus,
    requested: ApplicationStatus,
) -> Result<(), Denial> {
    match caller {
        CallerContext::Employer { id } if *id == owner.employer_id => Ok(()),
        CallerContext::Student { id } if *id == owner.student_id => match requested {
            ApplicationStatus::Withdrawn => Ok(()),
            ApplicationStatus::Accepted if current == ApplicationStatus::OfferGiven => Ok(()),
            _ => Err(Denial::StudentMayOnlyWithdrawOrAcceptOffer),
        },
        _ => Err(Denial::NotOwner),
    }
}

/// Orders the employer view by triage priority, then by application id.
pub fn sort_by_priority(views: &mut [EmployerApplicationView]) {
    views.sort_by_key(|view| (view.status.priority(), view.id));
}

pub fn student_view(row: StudentApplicationRow) -> Option<StudentApplicationView> {
    if row.internship_active == Some(false) {
        return None;
    }
    Some(StudentApplicationView {
        id: row.id,
        role: row.role.unwrap_or_else(|| MISSING.to_string()),
        employer: row.employer_name.unwrap_or_else(|| MISSING.to_string()),
        status: row.status,
    })
}

pub fn employer_view(row: EmployerApplicationRow) -> EmployerApplicationView {
    EmployerApplicationView {
        id: row.id,
        student_id: row.student_id,
        student_name: row.student_name.unwrap_or_else(|| MISSING.to_string()),
        role: row.role.unwrap_or_else(|| MISSING.to_string()),
        status: row.status,
        internship_id: row.internship_id,
    }
}

pub struct ApplicationService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    pub async fn create_application(
        &self,
        caller: &CallerContext,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Application, AppError> {
        if !caller.is_student(student_id) {
            return Err(AppError::Forbidden(
                "Applications can only be submitted by the applying student".to_string(),
            ));
        }

        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        let internship = self
            .store
            .find_internship(internship_id)
            .await?
            .filter(|internship| internship.active)
            .ok_or_else(|| AppError::NotFound("Internship not found".to_string()))?;

        if internship.deadline < Utc::now() {
            return Err(AppError::invalid(
                "internshipId",
                "The application deadline for this internship has passed",
            ));
        }

        if let Some(open) = self
            .store
            .find_open_application(student_id, internship_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Application {} for this internship is still open",
                open.id
            )));
        }

        let application = self
            .store
            .create_application(student_id, internship_id)
            .await?;

        LOGGER.log_business_event(
            "application_created",
            Some(student_id),
            fields([
                ("application_id", Value::from(application.id)),
                ("internship_id", Value::from(internship_id)),
            ]),
        );

        let message = self.notifications.application_confirmation(
            &student,
            &internship.role,
            application.id,
        );
        self.notifications.dispatch(message);

        Ok(application)
    }

    /// Fetches an application visible to the caller: its student or the
    /// employer owning the posting.
    pub async fn get_application(
        &self,
        caller: &CallerContext,
        application_id: i64,
    ) -> Result<Application, AppError> {
        let application = self.find(application_id).await?;
        let owner = self.ownership(&application).await?;

        if caller.is_student(owner.student_id) || caller.is_employer(owner.employer_id) {
            Ok(application)
        } else {
            Err(AppError::Forbidden(Denial::NotOwner.message().to_string()))
        }
    }

    /// Applies a requested status change on behalf of `caller`.
    ///
    /// Checks run in order: the application exists, the status is one of the
    /// known values, the caller is allowed to request it, and the application
    /// is not already terminal.
    pub async fn transition(
        &self,
        caller: &CallerContext,
        application_id: i64,
        requested: &str,
    ) -> Result<Application, AppError> {
        let application = self.find(application_id).await?;

        let requested: ApplicationStatus = requested
            .parse()
            .map_err(|e: UnknownStatus| AppError::invalid("status", e.to_string()))?;

        let owner = self.ownership(&application).await?;
        authorize_transition(caller, owner, application.status, requested)
            .map_err(|denial| AppError::Forbidden(denial.message().to_string()))?;

        if application.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Application is already {} and can no longer change",
                application.status
            )));
        }

        let updated = self
            .store
            .update_application_status(application.id, application.status, requested)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(
                    "Application status changed concurrently; reload and retry".to_string(),
                )
            })?;

        LOGGER.log_business_event(
            "application_status_changed",
            Some(caller.id()),
            fields([
                ("application_id", Value::from(updated.id)),
                ("from", Value::from(application.status.label())),
                ("to", Value::from(updated.status.label())),
                ("caller_role", Value::from(caller.role().as_str())),
            ]),
        );

        self.notify_status(&updated).await;
        Ok(updated)
    }

    pub async fn withdraw(
        &self,
        caller: &CallerContext,
        application_id: i64,
    ) -> Result<Application, AppError> {
        self.transition(caller, application_id, ApplicationStatus::Withdrawn.label())
            .await
    }

    pub async fn accept(
        &self,
        caller: &CallerContext,
        application_id: i64,
    ) -> Result<Application, AppError> {
        self.transition(caller, application_id, ApplicationStatus::Accepted.label())
            .await
    }

    pub async fn list_by_student(
        &self,
        caller: &CallerContext,
        student_id: i64,
    ) -> Result<Vec<StudentApplicationView>, AppError> {
        if !caller.is_student(student_id) {
            return Err(AppError::Forbidden(
                "Students may only list their own applications".to_string(),
            ));
        }

        let rows = self.store.student_application_rows(student_id).await?;
        Ok(rows.into_iter().filter_map(student_view).collect())
    }

    pub async fn list_by_employer(
        &self,
        caller: &CallerContext,
        employer_id: i64,
    ) -> Result<Vec<EmployerApplicationView>, AppError> {
        if !caller.is_employer(employer_id) {
            return Err(AppError::Forbidden(
                "Employers may only list applications to their own internships".to_string(),
            ));
        }

        let rows = self.store.employer_application_rows(employer_id).await?;
        let mut views: Vec<_> = rows.into_iter().map(employer_view).collect();
        sort_by_priority(&mut views);
        Ok(views)
    }

    /// Best-effort status email for an application whose status just changed.
    pub async fn notify_status(&self, application: &Application) {
        let student = match self.store.find_student(application.student_id).await {
            Ok(Some(student)) => student,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(application_id = application.id, "status email skipped: {}", e);
                return;
            }
        };
        let role = match self.store.find_internship(application.internship_id).await {
            Ok(Some(internship)) => internship.role,
            _ => MISSING.to_string(),
        };

        let message = self.notifications.status_update(
            &student,
            &role,
            application.id,
            application.status,
        );
        self.notifications.dispatch(message);
    }

    async fn find(&self, application_id: i64) -> Result<Application, AppError> {
        self.store
            .find_application(application_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))
    }

    async fn ownership(&self, application: &Application) -> Result<Ownership, AppError> {
        let internship = self
            .store
            .find_internship(application.internship_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Internship not found".to_string()))?;

        Ok(Ownership {
            student_id: application.student_id,
            employer_id: internship.employer_id,
        })
    }
}
