use axum::{
    extract::{Extension, State},
    response::Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    models::{
        session::CallerContext,
        student::{Student, StudentDocumentsRequest, StudentMessage, StudentProfileRequest},
    },
    utils::errors::AppError,
    AppState,
};

pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<StudentProfileRequest>,
) -> Result<Json<StudentMessage>, AppError> {
    payload.validate()?;

    let student = state
        .students()
        .complete_profile(&caller, payload.into())
        .await?;
    Ok(Json(StudentMessage {
        message: "Profile completed successfully".to_string(),
        student,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(state.students().profile(&caller).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<StudentProfileRequest>,
) -> Result<Json<StudentMessage>, AppError> {
    payload.validate()?;

    let student = state
        .students()
        .update_profile(&caller, payload.into())
        .await?;
    Ok(Json(StudentMessage {
        message: "Profile updated successfully".to_string(),
        student,
    }))
}

pub async fn set_documents(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<StudentDocumentsRequest>,
) -> Result<Json<StudentMessage>, AppError> {
    payload.validate()?;

    let student = state
        .students()
        .set_documents(&caller, payload.documents)
        .await?;
    Ok(Json(StudentMessage {
        message: "Documents updated successfully".to_string(),
        student,
    }))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<Value>, AppError> {
    state.students().delete(&caller).await?;
    Ok(Json(json!({ "message": "Student profile deleted successfully" })))
}
