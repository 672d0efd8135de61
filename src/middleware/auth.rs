use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    models::session::CallerContext,
    utils::{errors::AppError, jwt::verify_jwt},
    AppState,
};

pub const SESSION_COOKIE: &str = "token";

/// Reads the session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Verifies the token and re-resolves the account it names, so deleted
/// accounts lose access immediately.
pub async fn resolve_caller(state: &AppState, token: &str) -> Result<CallerContext, AppError> {
    let claims = verify_jwt(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Forbidden("Invalid token".to_string()))?;

    match claims.caller() {
        Some(CallerContext::Employer { .. }) => {
            let employer = state
                .store
                .find_employer_by_email(&claims.email)
                .await?
                .ok_or_else(|| AppError::NotFound("Employer not found".to_string()))?;
            Ok(CallerContext::Employer { id: employer.id })
        }
        Some(CallerContext::Student { id }) => {
            let student = state
                .store
                .find_student(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;
            Ok(CallerContext::Student { id: student.id })
        }
        None => Err(AppError::Forbidden("Invalid token".to_string())),
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

    let caller = resolve_caller(&state, &token).await?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
