mod common;

use common::{harness, harness_with, internship, student};
use internship_portal::{
    models::{
        employer::RegisterEmployerRequest,
        session::{CallerContext, IdentityProfile},
    },
    services::notification::RecordingMailer,
    store::Store,
    utils::{errors::AppError, jwt::verify_jwt},
};

fn registration(email: &str) -> RegisterEmployerRequest {
    RegisterEmployerRequest {
        name: "Acme Labs".to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        phone: "+91 40 1234 5678".to_string(),
        address: "Hyderabad".to_string(),
    }
}

fn profile(email: &str) -> IdentityProfile {
    IdentityProfile {
        subject: "google-123".to_string(),
        email: email.to_string(),
        name: "Priya".to_string(),
        picture: Some("https://example.com/p.png".to_string()),
    }
}

#[tokio::test]
async fn employer_register_login_and_duplicate_email() {
    let h = harness();
    let accounts = h.state.employers();

    let employer = accounts.register(registration("hr@acme.io")).await.unwrap();
    assert_ne!(employer.password_hash, "secret123");

    let err = accounts
        .register(registration("HR@acme.io"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let (token, logged_in) = accounts.login("hr@acme.io", "secret123").await.unwrap();
    assert_eq!(logged_in.id, employer.id);
    let claims = verify_jwt(&token, common::JWT_SECRET).unwrap();
    assert_eq!(claims.caller(), Some(CallerContext::Employer { id: employer.id }));

    let err = accounts.login("hr@acme.io", "wrong-pass").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    let err = accounts.login("nobody@acme.io", "secret123").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn password_reset_round_trip() {
    let h = harness();
    let accounts = h.state.employers();
    accounts.register(registration("hr@acme.io")).await.unwrap();

    let token = accounts
        .send_password_reset_email("hr@acme.io")
        .await
        .unwrap();

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Password Reset Request");
    assert!(sent[0].text.contains(&token));

    let err = accounts
        .reset_password("hr@acme.io", "not-the-token", "newpass456")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    accounts
        .reset_password("hr@acme.io", &token, "newpass456")
        .await
        .unwrap();
    assert!(accounts.login("hr@acme.io", "newpass456").await.is_ok());
    assert!(accounts.login("hr@acme.io", "secret123").await.is_err());

    let err = accounts
        .send_password_reset_email("nobody@acme.io")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn password_reset_reports_mail_failure() {
    let h = harness_with(RecordingMailer::failing());
    let accounts = h.state.employers();
    accounts.register(registration("hr@acme.io")).await.unwrap();

    let err = accounts
        .send_password_reset_email("hr@acme.io")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InternalServerError(_)));
}

#[tokio::test]
async fn employer_delete_is_refused_while_postings_exist() {
    let h = harness();
    let accounts = h.state.employers();
    let employer = accounts.register(registration("hr@acme.io")).await.unwrap();
    let caller = CallerContext::Employer { id: employer.id };
    internship(&h.store, &caller, "Backend Intern").await;

    let err = accounts.delete_profile(&caller).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(h.store.find_employer(employer.id).await.unwrap().is_some());
}

#[tokio::test]
async fn first_sign_in_derives_the_student_id() {
    let h = harness();
    let students = h.state.students();

    let (token, created) = students
        .sign_in(&profile("f20210042@hyderabad.bits-pilani.ac.in"))
        .await
        .unwrap();
    assert_eq!(created.id, 41120210042);
    assert_eq!(created.name, "Priya");
    let claims = verify_jwt(&token, common::JWT_SECRET).unwrap();
    assert_eq!(claims.caller(), Some(CallerContext::Student { id: 41120210042 }));

    let (_, again) = students
        .sign_in(&profile("f20210042@hyderabad.bits-pilani.ac.in"))
        .await
        .unwrap();
    assert_eq!(again.id, created.id);
}

#[tokio::test]
async fn sign_in_rejects_foreign_domains_and_digitless_emails() {
    let h = harness();
    let students = h.state.students();

    let err = students
        .sign_in(&profile("f20210042@gmail.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = students
        .sign_in(&profile("priya@hyderabad.bits-pilani.ac.in"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn deleting_a_student_removes_their_applications() {
    let h = harness();
    let acme = common::employer(&h.store, "hr@acme.io").await;
    let alice = student(&h.store, 41120210001).await;
    let posting = internship(&h.store, &acme, "Backend Intern").await;
    h.state
        .applications()
        .create_application(&alice, alice.id(), posting)
        .await
        .unwrap();

    h.state.students().delete(&alice).await.unwrap();
    assert_eq!(h.store.application_count(), 0);
    assert!(h.store.find_student(alice.id()).await.unwrap().is_none());

    let err = h.state.students().profile(&alice).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
