use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    models::{
        application::{
            Application, ApplicationMessage, CreateApplicationRequest, EmployerApplicationView,
            StudentApplicationView, UpdateStatusRequest,
        },
        session::CallerContext,
    },
    utils::{errors::AppError, logger::LOGGER},
    AppState,
};

pub async fn create_application(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    payload.validate()?;

    let application = state
        .applications()
        .create_application(&caller, payload.student_id, payload.internship_id)
        .await?;

    LOGGER.log_request("POST", "/applications", Some(caller.id()), 201);
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn get_application(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<Application>, AppError> {
    let application = state.applications().get_application(&caller, id).await?;
    Ok(Json(application))
}

pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationMessage>, AppError> {
    payload.validate()?;

    let application = state
        .applications()
        .transition(&caller, id, &payload.status)
        .await?;

    Ok(Json(ApplicationMessage {
        message: "Application updated successfully".to_string(),
        application,
    }))
}

pub async fn withdraw_application(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationMessage>, AppError> {
    let application = state.applications().withdraw(&caller, id).await?;
    Ok(Json(ApplicationMessage {
        message: "Application withdrawn successfully".to_string(),
        application,
    }))
}

pub async fn accept_application(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<ApplicationMessage>, AppError> {
    let application = state.applications().accept(&caller, id).await?;
    Ok(Json(ApplicationMessage {
        message: "Offer accepted successfully".to_string(),
        application,
    }))
}

pub async fn get_student_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(student_id): Path<i64>,
) -> Result<Json<Vec<StudentApplicationView>>, AppError> {
    let applications = state
        .applications()
        .list_by_student(&caller, student_id)
        .await?;
    Ok(Json(applications))
}

pub async fn get_employer_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(employer_id): Path<i64>,
) -> Result<Json<Vec<EmployerApplicationView>>, AppError> {
    let applications = state
        .applications()
        .list_by_employer(&caller, employer_id)
        .await?;
    Ok(Json(applications))
}
