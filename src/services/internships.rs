//! Internship postings and the soft-delete cascade onto their applications.

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{
    internship::{Internship, InternshipChanges, InternshipListing, NewInternship},
    session::CallerContext,
};
use crate::services::applications::ApplicationService;
use crate::store::Store;
use crate::utils::{
    errors::AppError,
    logger::{fields, LOGGER},
};

pub struct InternshipService {
    store: Arc<dyn Store>,
    applications: ApplicationService,
}

impl InternshipService {
    pub fn new(store: Arc<dyn Store>, applications: ApplicationService) -> Self {
        Self {
            store,
            applications,
        }
    }

    pub async fn create_internship(
        &self,
        caller: &CallerContext,
        mut internship: NewInternship,
    ) -> Result<Internship, AppError> {
        let CallerContext::Employer { id: employer_id } = *caller else {
            return Err(AppError::Forbidden(
                "Only employers can post internships".to_string(),
            ));
        };
        internship.employer_id = employer_id;

        let created = self.store.create_internship(internship).await?;

        LOGGER.log_business_event(
            "internship_created",
            Some(employer_id),
            fields([("internship_id", Value::from(created.id))]),
        );
        Ok(created)
    }

    pub async fn update_internship(
        &self,
        caller: &CallerContext,
        internship_id: i64,
        changes: InternshipChanges,
    ) -> Result<Internship, AppError> {
        self.owned_active(caller, internship_id).await?;

        self.store
            .update_internship(internship_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Internship not found".to_string()))
    }

    /// Soft-deletes the posting and rejects every open application for it in
    /// one storage transaction, then emails the affected students.
    ///
    /// Returns how many applications the cascade rejected.
    pub async fn deactivate_internship(
        &self,
        caller: &CallerContext,
        internship_id: i64,
    ) -> Result<usize, AppError> {
        self.owned_active(caller, internship_id).await?;

        let deactivation = self
            .store
            .deactivate_internship(internship_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Internship not found".to_string()))?;

        let rejected = deactivation.rejected.len();
        LOGGER.log_business_event(
            "internship_deactivated",
            Some(caller.id()),
            fields([
                ("internship_id", Value::from(internship_id)),
                ("rejected_applications", Value::from(rejected)),
            ]),
        );

        for application in &deactivation.rejected {
            self.applications.notify_status(application).await;
        }

        Ok(rejected)
    }

    /// Active postings only; deactivated ones are reported as missing.
    pub async fn get_internship(&self, internship_id: i64) -> Result<Internship, AppError> {
        self.store
            .find_internship(internship_id)
            .await?
            .filter(|internship| internship.active)
            .ok_or_else(|| AppError::NotFound("Internship not found".to_string()))
    }

    pub async fn list_with_employers(&self) -> Result<Vec<InternshipListing>, AppError> {
        Ok(self.store.list_active_internships().await?)
    }

    pub async fn list_by_employer(&self, employer_id: i64) -> Result<Vec<Internship>, AppError> {
        Ok(self
            .store
            .list_active_internships_by_employer(employer_id)
            .await?)
    }

    /// Distinct role titles the employer currently has open.
    pub async fn roles_by_employer(&self, employer_id: i64) -> Result<Vec<String>, AppError> {
        let roles: BTreeSet<String> = self
            .list_by_employer(employer_id)
            .await?
            .into_iter()
            .map(|internship| internship.role)
            .collect();
        Ok(roles.into_iter().collect())
    }

    async fn owned_active(
        &self,
        caller: &CallerContext,
        internship_id: i64,
    ) -> Result<Internship, AppError> {
        let internship = self.get_internship(internship_id).await?;
        if !caller.is_employer(internship.employer_id) {
            return Err(AppError::Forbidden(
                "Only the posting employer can modify this internship".to_string(),
            ));
        }
        Ok(internship)
    }
}
