use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};

use super::{Deactivation, Store, StoreError};
use crate::models::{
    application::{Application, ApplicationStatus, EmployerApplicationRow, StudentApplicationRow},
    employer::{Employer, EmployerChanges, NewEmployer},
    internship::{Internship, InternshipChanges, InternshipListing, NewInternship},
    student::{NewStudent, Student, StudentChanges},
};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_student(&self, id: i64) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(student)
    }

    async fn student_id_for_email(&self, email: &str) -> Result<Option<i64>, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT student_id FROM student_identities WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn create_student(&self, student: NewStudent) -> Result<Student, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students (id, email, name, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(student.id)
        .bind(&student.email)
        .bind(&student.name)
        .bind(&student.photo_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO student_identities (email, student_id) VALUES ($1, $2)")
            .bind(&student.email)
            .bind(student.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn link_student_identity(&self, email: &str, student_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO student_identities (email, student_id)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_student(
        &self,
        id: i64,
        changes: StudentChanges,
    ) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            UPDATE students
            SET name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                institution_id = COALESCE($4, institution_id),
                photo_url = COALESCE($5, photo_url),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.institution_id)
        .bind(&changes.photo_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn set_student_documents(
        &self,
        id: i64,
        documents: Vec<String>,
    ) -> Result<Option<Student>, StoreError> {
        let student = sqlx::query_as::<_, Student>(
            "UPDATE students SET documents = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(&documents)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn delete_student(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM applications WHERE student_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM student_identities WHERE student_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_employer(&self, id: i64) -> Result<Option<Employer>, StoreError> {
        let employer = sqlx::query_as::<_, Employer>("SELECT * FROM employers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employer)
    }

    async fn find_employer_by_email(&self, email: &str) -> Result<Option<Employer>, StoreError> {
        let employer = sqlx::query_as::<_, Employer>(
            "SELECT * FROM employers WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employer)
    }

    async fn create_employer(&self, employer: NewEmployer) -> Result<Employer, StoreError> {
        let created = sqlx::query_as::<_, Employer>(
            r#"
            INSERT INTO employers (name, email, password_hash, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&employer.name)
        .bind(&employer.email)
        .bind(&employer.password_hash)
        .bind(&employer.phone)
        .bind(&employer.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict("Employer with this email already exists".to_string())
            }
            other => other,
        })?;
        Ok(created)
    }

    async fn update_employer(
        &self,
        id: i64,
        changes: EmployerChanges,
    ) -> Result<Option<Employer>, StoreError> {
        let employer = sqlx::query_as::<_, Employer>(
            r#"
            UPDATE employers
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                photo_url = COALESCE($5, photo_url),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.photo_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employer)
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE employers
            SET reset_token_hash = $1, reset_token_expires_at = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(&token_hash)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Employer"));
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: i64, password_hash: String) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE employers
            SET password_hash = $1,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(&password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Employer"));
        }
        Ok(())
    }

    async fn delete_employer(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let owns_internships = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM internships WHERE employer_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if owns_internships {
            return Err(StoreError::Conflict(
                "Employer still owns internships".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM employers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_internship(&self, internship: NewInternship) -> Result<Internship, StoreError> {
        let created = sqlx::query_as::<_, Internship>(
            r#"
            INSERT INTO internships (employer_id, role, description, deadline, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(internship.employer_id)
        .bind(&internship.role)
        .bind(&internship.description)
        .bind(internship.deadline)
        .bind(Json(&internship.details))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_internship(
        &self,
        id: i64,
        changes: InternshipChanges,
    ) -> Result<Option<Internship>, StoreError> {
        let internship = sqlx::query_as::<_, Internship>(
            r#"
            UPDATE internships
            SET role = COALESCE($1, role),
                description = COALESCE($2, description),
                deadline = COALESCE($3, deadline),
                details = COALESCE($4, details),
                updated_at = NOW()
            WHERE id = $5 AND active
            RETURNING *
            "#,
        )
        .bind(&changes.role)
        .bind(&changes.description)
        .bind(changes.deadline)
        .bind(changes.details.as_ref().map(Json))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(internship)
    }

    async fn find_internship(&self, id: i64) -> Result<Option<Internship>, StoreError> {
        let internship = sqlx::query_as::<_, Internship>("SELECT * FROM internships WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(internship)
    }

    async fn list_active_internships(&self) -> Result<Vec<InternshipListing>, StoreError> {
        let listings = sqlx::query_as::<_, InternshipListing>(
            r#"
            SELECT i.*, e.name AS employer_name, e.email AS employer_email
            FROM internships i
            LEFT JOIN employers e ON e.id = i.employer_id
            WHERE i.active
            ORDER BY i.deadline ASC, i.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn list_active_internships_by_employer(
        &self,
        employer_id: i64,
    ) -> Result<Vec<Internship>, StoreError> {
        let internships = sqlx::query_as::<_, Internship>(
            r#"
            SELECT * FROM internships
            WHERE employer_id = $1 AND active
            ORDER BY deadline ASC, id ASC
            "#,
        )
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(internships)
    }

    async fn deactivate_internship(&self, id: i64) -> Result<Option<Deactivation>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let internship = sqlx::query_as::<_, Internship>(
            r#"
            UPDATE internships
            SET active = FALSE, updated_at = NOW()
            WHERE id = $1 AND active
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(internship) = internship else {
            return Ok(None);
        };

        let rejected = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = 'Rejected', updated_at = NOW()
            WHERE internship_id = $1
              AND status IN ('Applied', 'Interview Scheduled', 'Offer Given')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
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
        // FOR SHARE waits on a concurrent deactivation's row lock, so the
        // insert sees the committed `active` flag.
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (student_id, internship_id, status)
            SELECT $1, $2, $3
            WHERE EXISTS (
                SELECT 1 FROM internships WHERE id = $2 AND active FOR SHARE
            )
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(internship_id)
        .bind(ApplicationStatus::Applied)
        .fetch_optional(&self.pool)
        .await?;
        application.ok_or(StoreError::NotFound("Internship"))
    }

    async fn find_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(application)
    }

    async fn find_open_application(
        &self,
        student_id: i64,
        internship_id: i64,
    ) -> Result<Option<Application>, StoreError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE student_id = $1
              AND internship_id = $2
              AND status IN ('Applied', 'Interview Scheduled', 'Offer Given')
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(internship_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn update_application_status(
        &self,
        id: i64,
        expected: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<Option<Application>, StoreError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(next)
        .bind(id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn student_application_rows(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentApplicationRow>, StoreError> {
        let rows = sqlx::query_as::<_, StudentApplicationRow>(
            r#"
            SELECT a.id,
                   a.status,
                   a.internship_id,
                   i.role AS role,
                   i.active AS internship_active,
                   e.name AS employer_name
            FROM applications a
            LEFT JOIN internships i ON i.id = a.internship_id
            LEFT JOIN employers e ON e.id = i.employer_id
            WHERE a.student_id = $1
            ORDER BY a.id ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn employer_application_rows(
        &self,
        employer_id: i64,
    ) -> Result<Vec<EmployerApplicationRow>, StoreError> {
        let rows = sqlx::query_as::<_, EmployerApplicationRow>(
            r#"
            SELECT a.id,
                   a.student_id,
                   s.name AS student_name,
                   i.role AS role,
                   a.status,
                   a.internship_id
            FROM applications a
            JOIN internships i ON i.id = a.internship_id
            LEFT JOIN students s ON s.id = a.student_id
            WHERE i.employer_id = $1
            ORDER BY a.id ASC
            "#,
        )
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
