use axum::{
    extract::{Extension, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::auth::SESSION_COOKIE,
    models::session::{CallerContext, Role, SessionResponse, SessionUser},
    services::identity_provider::IdentityProvider,
    utils::{
        errors::AppError,
        logger::{fields, LOGGER},
    },
    AppState,
};

const STATE_COOKIE: &str = "oauth_state";

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn identity_provider(state: &AppState) -> Result<&dyn IdentityProvider, AppError> {
    state
        .identity
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Student sign-in is not configured".to_string()))
}

fn cookie(state: &AppState, name: &str, value: &str, max_age: i64) -> String {
    let secure = if state.config.frontend_url.starts_with("https://") {
        "; Secure"
    } else {
        ""
    };
    format!("{name}={value}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax{secure}")
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Starts the student sign-in flow at the identity provider.
pub async fn google_login(State(state): State<AppState>) -> Result<Response, AppError> {
    let provider = identity_provider(&state)?;
    let csrf = Uuid::new_v4().simple().to_string();
    let location = provider.authorization_url(&csrf);

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location),
            (header::SET_COOKIE, cookie(&state, STATE_COOKIE, &csrf, 600)),
        ],
    )
        .into_response())
}

/// Completes the sign-in: exchanges the code, resolves the student, sets the
/// session cookie and sends the browser to the dashboard.
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let provider = identity_provider(&state)?;

    if let Some(error) = params.error {
        return Err(AppError::Unauthorized(format!("Sign-in was cancelled: {error}")));
    }

    let expected = cookie_value(&headers, STATE_COOKIE);
    if expected.is_none() || expected != params.state {
        return Err(AppError::BadRequest("Sign-in state mismatch".to_string()));
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let profile = provider.exchange_code(&code).await.map_err(|err| {
        LOGGER.log_error(
            "Identity provider exchange failed",
            fields([("reason", Value::from(err.to_string()))]),
        );
        AppError::Unauthorized("Sign-in failed".to_string())
    })?;

    let (token, student) = state.students().sign_in(&profile).await?;
    let max_age = state.config.token_ttl().num_seconds();
    let location = format!("{}/dashboard", state.config.frontend_url.trim_end_matches('/'));

    let body = SessionResponse {
        token: token.clone(),
        user: SessionUser {
            id: student.id,
            email: student.email,
            role: Role::Student,
            display_name: student.name,
            photo: student.photo_url,
        },
    };

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location),
            (header::SET_COOKIE, cookie(&state, SESSION_COOKIE, &token, max_age)),
        ],
        AppendHeaders([(header::SET_COOKIE, cookie(&state, STATE_COOKIE, "", 0))]),
        Json(body),
    )
        .into_response())
}

pub async fn userinfo(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<SessionUser>, AppError> {
    let user = match caller {
        CallerContext::Student { .. } => {
            let student = state.students().profile(&caller).await?;
            SessionUser {
                id: student.id,
                email: student.email,
                role: Role::Student,
                display_name: student.name,
                photo: student.photo_url,
            }
        }
        CallerContext::Employer { .. } => {
            let employer = state.employers().profile(&caller).await?;
            SessionUser {
                id: employer.id,
                email: employer.email,
                role: Role::Employer,
                display_name: employer.name,
                photo: employer.photo_url,
            }
        }
    };

    Ok(Json(user))
}

pub async fn logout(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie(&state, SESSION_COOKIE, "", 0))],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}
