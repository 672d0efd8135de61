use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    models::{
        employer::{
            EmployerLoginRequest, EmployerLoginResponse, EmployerResponse,
            PasswordResetEmailRequest, RegisterEmployerRequest, ResetPasswordRequest,
            UpdateEmployerRequest,
        },
        session::CallerContext,
    },
    utils::errors::AppError,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterEmployerRequest>,
) -> Result<(StatusCode, Json<EmployerResponse>), AppError> {
    payload.validate()?;

    let employer = state.employers().register(payload).await?;
    Ok((StatusCode::CREATED, Json(EmployerResponse::from(employer))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<EmployerLoginRequest>,
) -> Result<Json<EmployerLoginResponse>, AppError> {
    payload.validate()?;

    let (token, employer) = state
        .employers()
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(EmployerLoginResponse {
        message: "Login successful".to_string(),
        token,
        employer: EmployerResponse::from(employer),
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<EmployerResponse>, AppError> {
    let employer = state.employers().profile(&caller).await?;
    Ok(Json(EmployerResponse::from(employer)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<UpdateEmployerRequest>,
) -> Result<Json<EmployerResponse>, AppError> {
    payload.validate()?;

    let employer = state
        .employers()
        .update_profile(&caller, payload.into())
        .await?;
    Ok(Json(EmployerResponse::from(employer)))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Value>, AppError> {
    state.employers().delete_profile(&caller).await?;
    Ok(Json(json!({ "message": "Employer profile deleted successfully" })))
}

pub async fn send_password_reset_email(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetEmailRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    state
        .employers()
        .send_password_reset_email(&payload.email)
        .await?;
    Ok(Json(json!({ "message": "Password reset email sent successfully" })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    state
        .employers()
        .reset_password(&payload.email, &payload.token, &payload.new_password)
        .await?;
    Ok(Json(json!({
        "message": "Password reset successfully. You can now log in with your new password."
    })))
}
