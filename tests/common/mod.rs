#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::sync::Arc;

use internship_portal::{
    models::{
        employer::NewEmployer,
        internship::{InternshipDetails, NewInternship},
        session::CallerContext,
        student::NewStudent,
    },
    services::notification::{NotificationService, RecordingMailer},
    store::{MemoryStore, Store},
    utils::config::AppConfig,
    AppState,
};

pub const JWT_SECRET: &str = "test-secret";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

pub fn harness() -> Harness {
    harness_with(RecordingMailer::new())
}

pub fn harness_with(mailer: RecordingMailer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);
    let notifications = NotificationService::new(mailer.clone(), "portal@test.local");
    let state = AppState::new(
        store.clone(),
        AppConfig::for_tests(JWT_SECRET),
        notifications,
        None,
    );
    Harness {
        store,
        mailer,
        state,
    }
}

pub async fn employer(store: &MemoryStore, email: &str) -> CallerContext {
    let employer = store
        .create_employer(NewEmployer {
            name: "Acme Labs".to_string(),
            email: email.to_string(),
            password_hash: bcrypt::hash("secret123", 4).unwrap(),
            phone: "+91 40 1234 5678".to_string(),
            address: "Hyderabad".to_string(),
        })
        .await
        .unwrap();
    CallerContext::Employer { id: employer.id }
}

pub async fn student(store: &MemoryStore, id: i64) -> CallerContext {
    let student = store
        .create_student(NewStudent {
            id,
            email: format!("f{}@hyderabad.bits-pilani.ac.in", id),
            name: format!("Student {}", id),
            photo_url: None,
        })
        .await
        .unwrap();
    CallerContext::Student { id: student.id }
}

pub async fn internship(store: &MemoryStore, employer: &CallerContext, role: &str) -> i64 {
    store
        .create_internship(NewInternship {
            employer_id: employer.id(),
            role: role.to_string(),
            description: format!("{} internship", role),
            deadline: Utc::now() + Duration::days(30),
            details: InternshipDetails::default(),
        })
        .await
        .unwrap()
        .id
}
