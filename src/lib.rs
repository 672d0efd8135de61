pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{applications, auth, employers, internships, students},
    middleware::auth::auth_middleware,
    services::{
        accounts::{EmployerAccounts, StudentAccounts},
        applications::ApplicationService,
        identity_provider::IdentityProvider,
        internships::InternshipService,
        notification::NotificationService,
    },
    store::Store,
    utils::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub notifications: NotificationService,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: AppConfig,
        notifications: NotificationService,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            notifications,
            identity,
        }
    }

    pub fn applications(&self) -> ApplicationService {
        ApplicationService::new(self.store.clone(), self.notifications.clone())
    }

    pub fn internships(&self) -> InternshipService {
        InternshipService::new(self.store.clone(), self.applications())
    }

    pub fn employers(&self) -> EmployerAccounts {
        EmployerAccounts::new(
            self.store.clone(),
            self.notifications.clone(),
            self.config.clone(),
        )
    }

    pub fn students(&self) -> StudentAccounts {
        StudentAccounts::new(self.store.clone(), self.config.clone())
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        cors.allow_origin(HeaderValue::from_static("*"))
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => cors.allow_origin(origin).allow_credentials(true),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                cors
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/applications", post(applications::create_application))
        .route(
            "/applications/:id",
            get(applications::get_application).put(applications::update_application_status),
        )
        .route(
            "/applications/:id/withdraw",
            post(applications::withdraw_application),
        )
        .route(
            "/applications/:id/accept",
            post(applications::accept_application),
        )
        .route(
            "/applications/student/:student_id",
            get(applications::get_student_applications),
        )
        .route(
            "/applications/employer/:employer_id",
            get(applications::get_employer_applications),
        )
        .route("/internships", post(internships::create_internship))
        .route(
            "/internships/:id",
            put(internships::update_internship).delete(internships::delete_internship),
        )
        .route(
            "/employer/profile",
            get(employers::get_profile)
                .put(employers::update_profile)
                .delete(employers::delete_profile),
        )
        .route("/student/complete-profile", post(students::complete_profile))
        .route(
            "/student/profile",
            get(students::get_profile)
                .put(students::update_profile)
                .delete(students::delete_profile),
        )
        .route("/student/documents", put(students::set_documents))
        .route("/auth/userinfo", get(auth::userinfo))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/employer/register", post(employers::register))
        .route("/employer/login", post(employers::login))
        .route(
            "/employer/send-password-reset-email",
            post(employers::send_password_reset_email),
        )
        .route("/employer/reset-password", post(employers::reset_password))
        .route("/internships/with-employers", get(internships::list_with_employers))
        .route(
            "/internships/by-employer/:employer_id",
            get(internships::list_by_employer),
        )
        .route(
            "/internships/roles/:employer_id",
            get(internships::roles_by_employer),
        )
        .route("/internships/:id", get(internships::get_internship))
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/logout", post(auth::logout))
        .merge(protected_routes)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
