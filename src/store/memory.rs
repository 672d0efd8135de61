use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{Deactivation, Store, StoreError};
use crate::models::{
    application::{Application, ApplicationStatus, EmployerApplicationRow, StudentApplicationRow},
    employer::{Employer, EmployerChanges, NewEmployer},
    internship::{Internship, InternshipChanges, InternshipListing, NewInternship},
    student::{NewStudent, Student, StudentChanges},
};

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<i64, Student>,
    identities: HashMap<String, i64>,
    employers: BTreeMap<i64, Employer>,
    internships: BTreeMap<i64, Internship>,
    applications: BTreeMap<i64, Application>,
    next_employer_id: i64,
    next_internship_id: i64,
    next_application_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn employer_email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.employers
            .values()
            .any(|e| e.email.eq_ignore_ascii_case(email) && Some(e.id) != except)
    }
}

/// Single-process store with the same observable semantics as [`super::PgStore`].
/// Every operation runs under one lock, so multi-row writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }

    pub fn application_count(&self) -> usize {
        self.lock().map(|t| t.applications.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_student(&self, id: i64) -> Result<Option<Student>, StoreError> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    async fn student_id_for_email(&self, email: &str) -> Result<Option<i64>, StoreError> {
        Ok(self
            .lock()?
            .identities
            .get(&email.to_ascii_lowercase())
            .copied())
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, StoreError> {
        let mut tables = self.lock()?;
        let key = student.email.to_ascii_lowercase();
        if tables.students.contains_key(&student.id)
            || tables.identities.contains_key(&key)
            || tables
                .students
                .values()
                .any(|s| s.email.eq_ignore_ascii_case(&student.email))
        {
            return Err(StoreError::Conflict("Resource already exists".to_string()));
        }

        let now = Utc::now();
        let created = Student {
            id: student.id,
            email: student.email,
            name: student.name,
            phone: None,
            address: None,
            institution_id: None,
            photo_url: student.photo_url,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.identities.insert(key, created.id);
        tables.students.insert(created.id, created.clone());
        Ok(created)
    }

    async fn link_student_identity(&self, email: &str, student_id: i64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.students.contains_key(&student_id) {
            return Err(StoreError::Conflict("Resource is still referenced".to_string()));
        }
        tables
            .identities
            .entry(email.to_ascii_lowercase())
            .or_insert(student_id);
        Ok(())
    }

    async fn update_student(
        &self,
        id: i64,
        changes: StudentChanges,
    ) -> Result<Option<Student>, StoreError> {
        let mut tables = self.lock()?;
        if let Some(institution_id) = &changes.institution_id {
            let taken = tables.students.values().any(|s| {
                s.id != id && s.institution_id.as_deref() == Some(institution_id.as_str())
            });
            if taken {
                return Err(StoreError::Conflict("Resource already exists".to_string()));
            }
        }

        let Some(student) = tables.students.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            student.name = name;
        }
        if let Some(phone) = changes.phone {
            student.phone = Some(phone);
        }
        if let Some(address) = changes.address {
            student.address = Some(address);
        }
        if let Some(institution_id) = changes.institution_id {
            student.institution_id = Some(institution_id);
        }
        if let Some(photo_url) = changes.photo_url {
            student.photo_url = Some(photo_url);
        }
        student.updated_at = Utc::now();
        Ok(Some(student.clone()))
    }

    async fn set_student_documents(
        &self,
        id: i64,
        documents: Vec<String>,
    ) -> Result<Option<Student>, StoreError> {
        let mut tables = self.lock()?;
        Ok(tables.students.get_mut(&id).map(|student| {
            student.documents = documents;
            student.updated_at = Utc::now();
            student.clone()
        }))
    }

    async fn delete_student(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        tables.applications.retain(|_, a| a.student_id != id);
        tables.identities.retain(|_, student_id| *student_id != id);
        Ok(tables.students.remove(&id).is_some())
    }

    async fn find_employer(&self, id: i64) -> Result<Option<Employer>, StoreError> {
        Ok(self.lock()?.employers.get(&id).cloned())
    }

    async fn find_employer_by_email(&self, email: &str) -> Result<Option<Employer>, StoreError> {
        Ok(self
            .lock()?
            .employers
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_employer(&self, employer: NewEmployer) -> Result<Employer, StoreError> {
        let mut tables = self.lock()?;
        if tables.employer_email_taken(&employer.email, None) {
            return Err(StoreError::Conflict(
                "Employer with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_employer_id);
        let created = Employer {
            id,
            name: employer.name,
            email: employer.email,
            password_hash: employer.password_hash,
            phone: employer.phone,
            address: employer.address,
            photo_url: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.employers.insert(id, created.clone());
        Ok(created)
    }

    async fn update_employer(
        &self,
        id: i64,
        changes: EmployerChanges,
    ) -> Result<Option<Employer>, StoreError> {
        let mut tables = self.lock()?;
        if let Some(email) = &changes.email {
            if tables.employer_email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("Resource already exists".to_string()));
            }
        }

        let Some(employer) = tables.employers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            employer.name = name;
        }
        if let Some(email) = changes.email {
            employer.email = email;
        }
        if let Some(phone) = changes.phone {
            employer.phone = phone;
        }
        if let Some(address) = changes.address {
            employer.address = address;
        }
        if let Some(photo_url) = changes.photo_url {
            employer.photo_url = Some(photo_url);
        }
        employer.updated_at = Utc::now();
        Ok(Some(employer.clone()))
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let employer = tables
            .employers
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Employer"))?;
        employer.reset_token_hash = token_hash;
        employer.reset_token_expires_at = expires_at;
        employer.updated_at = Utc::now();
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: String) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let employer = tables
            .employers
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Employer"))?;
        employer.password_hash = password_hash;
        employer.reset_token_hash = None;
        employer.reset_token_expires_at = None;
        employer.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_employer(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if tables.internships.values().any(|i| i.employer_id == id) {
            return Err(StoreError::Conflict(
                "Employer still owns internships".to_string(),
            ));
        }
        Ok(tables.employers.remove(&id).is_some())
    }

    async fn create_internship(&self, internship: NewInternship) -> Result<Internship, StoreError> {
        let mut tables = self.lock()?;
        if !tables.employers.contains_key(&internship.employer_id) {
            return Err(StoreError::Conflict("Resource is still referenced".to_string()));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_internship_id);
        let created = Internship {
            id,
            employer_id: internship.employer_id,
            role: internship.role,
            description: internship.description,
            deadline: internship.deadline,
            active: true,
            details: Json(internship.details),
            created_at: now,
            updated_at: now,
        };
        tables.internships.insert(id, created.clone());
        Ok(created)
    }

    async fn update_internship(
        &self,
        id: i64,
        changes: InternshipChanges,
    ) -> Result<Option<Internship>, StoreError> {
        let mut tables = self.lock()?;
        let Some(internship) = tables.internships.get_mut(&id).filter(|i| i.active) else {
            return Ok(None);
        };
        if let Some(role) = changes.role {
            internship.role = role;
        }
        if let Some(description) = changes.description {
            internship.description = description;
        }
        if let Some(deadline) = changes.deadline {
            internship.deadline = deadline;
        }
        if let Some(details) = changes.details {
            internship.details = Json(details);
        }
        internship.updated_at = Utc::now();
        Ok(Some(internship.clone()))
    }

    async fn find_internship(&self, id: i64) -> Result<Option<Internship>, StoreError> {
        Ok(self.lock()?.internships.get(&id).cloned())
    }

    async fn list_active_internships(&self) -> Result<Vec<InternshipListing>, StoreError> {
        let tables = self.lock()?;
        let mut listings: Vec<InternshipListing> = tables
            .internships
            .values()
            .filter(|i| i.active)
            .map(|internship| {
                let employer = tables.employers.get(&internship.employer_id);
                InternshipListing {
                    internship: internship.clone(),
                    employer_name: employer.map(|e| e.name.clone()),
                    employer_email: employer.map(|e| e.email.clone()),
                }
            })
            .collect();
        listings.sort_by_key(|l| (l.internship.deadline, l.internship.id));
        Ok(listings)
    }

    async fn list_active_internships_by_employer(
        &self,
        employer_id: i64,
    ) -> Result<Vec<Internship>, StoreError> {
        let tables = self.lock()?;
        let mut internships: Vec<Internship> = tables
            .internships
            .values()
            .filter(|i| i.active && i.employer_id == employer_id)
            .cloned()
            .collect();
        internships.sort_by_key(|i| (i.deadline, i.id));
        Ok(internships)
    }

    async fn deactivate_internship(&self, id: i64) -> Result<Option<Deactivation>, StoreError> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let Some(internship) = tables.internships.get_mut(&id).filter(|i| i.active) else {
            return Ok(None);
        };
        internship.active = false;
        internship.updated_at = now;
        let internship = internship.clone();

        let rejected = tables
            .applications
            .values_mut()
            .filter(|a| a.internship_id == id && !a.status.is_terminal())
            .map(|application| {
                application.status = ApplicationStatus::Rejected;
                application.updated_at = now;
                application.clone()
            })
            .collect();

        Ok(Some(Deactivation {
            internship,
            rejected,
        }))
    }

    async fn create_application(
        &self,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        if !tables.students.contains_key(&student_id) {
            return Err(StoreError::Conflict("Resource is still referenced".to_string()));
        }
        let active = tables
            .internships
            .get(&internship_id)
            .map_or(false, |internship| internship.active);
        if !active {
            return Err(StoreError::NotFound("Internship"));
        }
        let already_open = tables.applications.values().any(|a| {
            a.student_id == student_id
                && a.internship_id == internship_id
                && !a.status.is_terminal()
        });
        if already_open {
            return Err(StoreError::Conflict("Resource already exists".to_string()));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_application_id);
        let application = Application {
            id,
            student_id,
            internship_id,
            status: ApplicationStatus::Applied,
            created_at: now,
            updated_at: now,
        };
        tables.applications.insert(id, application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    async fn find_open_application(
        &self,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Option<Application>, StoreError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|a| {
                a.student_id == student_id
                    && a.internship_id == internship_id
                    && !a.status.is_terminal()
            })
            .cloned())
    }

    async fn update_application_status(
        &self,
        id: i64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError> {
        let mut tables = self.lock()?;
        Ok(tables
            .applications
            .get_mut(&id)
            .filter(|a| a.status == expected)
            .map(|application| {
                application.status = next;
                application.updated_at = Utc::now();
                application.clone()
            }))
    }

    async fn student_application_rows(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentApplicationRow>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .filter(|a| a.student_id == student_id)
            .map(|application| {
                let internship = tables.internships.get(&application.internship_id);
                let employer =
                    internship.and_then(|i| tables.employers.get(&i.employer_id));
                StudentApplicationRow {
                    id: application.id,
                    status: application.status,
                    internship_id: application.internship_id,
                    role: internship.map(|i| i.role.clone()),
                    internship_active: internship.map(|i| i.active),
                    employer_name: employer.map(|e| e.name.clone()),
                }
            })
            .collect())
    }

    async fn employer_application_rows(
        &self,
        employer_id: i64,
    ) -> Result<Vec<EmployerApplicationRow>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .applications
            .values()
            .filter_map(|application| {
                let internship = tables.internships.get(&application.internship_id)?;
                if internship.employer_id != employer_id {
                    return None;
                }
                Some(EmployerApplicationRow {
                    id: application.id,
                    student_id: application.student_id,
                    student_name: tables
                        .students
                        .get(&application.student_id)
                        .map(|s| s.name.clone()),
                    role: Some(internship.role.clone()),
                    status: application.status,
                    internship_id: application.internship_id,
                })
            })
            .collect())
    }
}
