mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{harness, student, Harness, JWT_SECRET};
use internship_portal::{
    models::session::{IdentityProfile, Role},
    router,
    services::identity_provider::{IdentityError, IdentityProvider},
    utils::jwt::create_jwt,
};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn employer_token(app: &Router, email: &str) -> (String, i64) {
    let (status, _) = send(
        app,
        Method::POST,
        "/employer/register",
        None,
        Some(json!({
            "name": "Acme Labs",
            "email": email,
            "password": "secret123",
            "phone": "+91 40 1234 5678",
            "address": "Hyderabad"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/employer/login",
        None,
        Some(json!({ "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["token"].as_str().unwrap().to_string(),
        body["employer"]["id"].as_i64().unwrap(),
    )
}

async fn student_token(h: &Harness, id: i64) -> String {
    student(&h.store, id).await;
    create_jwt(
        id,
        &format!("f{}@hyderabad.bits-pilani.ac.in", id),
        Role::Student,
        JWT_SECRET,
        chrono::Duration::minutes(5),
    )
    .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let h = harness();
    let app = router(h.state.clone());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let h = harness();
    let app = router(h.state.clone());

    let (status, body) = send(&app, Method::GET, "/student/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/student/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let forged = create_jwt(
        41120210001,
        "f41120210001@hyderabad.bits-pilani.ac.in",
        Role::Student,
        "another-secret",
        chrono::Duration::minutes(5),
    )
    .unwrap();
    let (status, _) = send(&app, Method::GET, "/student/profile", Some(&forged), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tokens_for_deleted_accounts_stop_working() {
    let h = harness();
    let app = router(h.state.clone());
    let token = student_token(&h, 41120210001).await;

    let (status, _) = send(&app, Method::DELETE, "/student/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/student/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let h = harness();
    let app = router(h.state.clone());
    let token = student_token(&h, 41120210001).await;

    let request = Request::get("/auth/userinfo")
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["id"], 41120210001i64);
    assert_eq!(body["role"], "student");
    assert_eq!(body["displayName"], "Student 41120210001");
}

#[tokio::test]
async fn application_lifecycle_over_http() {
    let h = harness();
    let app = router(h.state.clone());
    let (employer, employer_id) = employer_token(&app, "hr@acme.io").await;
    let alice = student_token(&h, 41120210001).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/internships",
        Some(&employer),
        Some(json!({
            "role": "Backend Intern",
            "description": "Rust services",
            "deadline": (chrono::Utc::now() + chrono::Duration::days(14)).to_rfc3339(),
            "details": { "salary": "40k", "techStack": ["Rust", "Postgres"] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let internship_id = body["internship"]["id"].as_i64().unwrap();
    assert_eq!(body["internship"]["employerId"], employer_id);

    let (status, body) = send(&app, Method::GET, "/internships/with-employers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["employerName"], "Acme Labs");
    assert_eq!(body[0]["details"]["techStack"][0], "Rust");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/internships/roles/{}", employer_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Backend Intern"]));

    let (status, body) = send(
        &app,
        Method::POST,
        "/applications",
        Some(&alice),
        Some(json!({ "studentId": 41120210001i64, "internshipId": internship_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Applied");
    let application_id = body["id"].as_i64().unwrap();
    let path = format!("/applications/{}", application_id);

    let (status, _) = send(
        &app,
        Method::PUT,
        &path,
        Some(&alice),
        Some(json!({ "status": "Accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &path,
        Some(&employer),
        Some(json!({ "status": "Promoted" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["status"].is_array());

    let (status, body) = send(
        &app,
        Method::PUT,
        &path,
        Some(&employer),
        Some(json!({ "status": "interview scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "Interview Scheduled");

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/internships/{}", internship_id),
        Some(&employer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rejectedApplications"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/applications/employer/{}", employer_id),
        Some(&employer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "Rejected");
    assert_eq!(body[0]["studentName"], "Student 41120210001");

    let (status, body) = send(
        &app,
        Method::GET,
        "/applications/student/41120210001",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/accept", path),
        Some(&employer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/internships/{}", internship_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.state.notifications.flush().await;
    assert_eq!(h.mailer.sent().len(), 3);
}

#[tokio::test]
async fn employer_cannot_be_deleted_while_owning_internships() {
    let h = harness();
    let app = router(h.state.clone());
    let (employer, _) = employer_token(&app, "hr@acme.io").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/internships",
        Some(&employer),
        Some(json!({
            "role": "Backend Intern",
            "description": "Rust services",
            "deadline": (chrono::Utc::now() + chrono::Duration::days(14)).to_rfc3339()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::DELETE, "/employer/profile", Some(&employer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn student_profile_and_documents() {
    let h = harness();
    let app = router(h.state.clone());
    let token = student_token(&h, 41120210001).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/student/complete-profile",
        Some(&token),
        Some(json!({ "phone": "9876543210" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["address"].is_array());

    let (status, body) = send(
        &app,
        Method::POST,
        "/student/complete-profile",
        Some(&token),
        Some(json!({
            "phone": "9876543210",
            "address": "Hostel 4",
            "institutionId": "2021A7PS0001H"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["institutionId"], "2021A7PS0001H");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/student/documents",
        Some(&token),
        Some(json!({ "documents": ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/student/documents",
        Some(&token),
        Some(json!({ "documents": ["resume.pdf", "transcript.pdf"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["documents"][0], "resume.pdf");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let h = harness();
    let app = router(h.state.clone());
    let response = app
        .oneshot(
            Request::post("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

struct StaticProvider {
    profile: IdentityProfile,
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://idp.test/authorize?state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityProfile, IdentityError> {
        if code == "good-code" {
            Ok(self.profile.clone())
        } else {
            Err(IdentityError::Rejected)
        }
    }
}

fn with_provider(h: &Harness, email: &str) -> Router {
    let mut state = h.state.clone();
    state.identity = Some(Arc::new(StaticProvider {
        profile: IdentityProfile {
            subject: "google-123".to_string(),
            email: email.to_string(),
            name: "Priya".to_string(),
            picture: None,
        },
    }));
    router(state)
}

#[tokio::test]
async fn google_sign_in_sets_the_session_cookie() {
    let h = harness();
    let app = with_provider(&h, "f20210042@hyderabad.bits-pilani.ac.in");

    let response = app
        .clone()
        .oneshot(Request::get("/auth/google").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let state = location.split("state=").nth(1).unwrap().to_string();

    let mismatched = app
        .clone()
        .oneshot(
            Request::get("/auth/google/callback?code=good-code&state=other")
                .header(header::COOKIE, format!("oauth_state={}", state))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(mismatched.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/auth/google/callback?code=good-code&state={}", state))
                .header(header::COOKIE, format!("oauth_state={}", state))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:5173/dashboard"
    );
    let session = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("token=") && !value.starts_with("token=;"))
        .map(str::to_string)
        .unwrap();
    assert!(session.contains("HttpOnly"));

    let token = session
        .trim_start_matches("token=")
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let (status, body) = send(&app, Method::GET, "/student/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 41120210042i64);
    assert_eq!(body["name"], "Priya");
}

#[tokio::test]
async fn google_sign_in_rejects_outside_domains() {
    let h = harness();
    let app = with_provider(&h, "priya@gmail.com");

    let response = app
        .oneshot(
            Request::get("/auth/google/callback?code=good-code&state=abc")
                .header(header::COOKIE, "oauth_state=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
