use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use validator::Validate;

use crate::{
    models::{
        internship::{
            CreateInternshipRequest, DeactivationResponse, Internship, InternshipListing,
            InternshipMessage, NewInternship, UpdateInternshipRequest,
        },
        session::CallerContext,
    },
    utils::{errors::AppError, logger::LOGGER},
    AppState,
};

pub async fn create_internship(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(payload): Json<CreateInternshipRequest>,
) -> Result<(StatusCode, Json<InternshipMessage>), AppError> {
    payload.validate()?;

    let internship = state
        .internships()
        .create_internship(
            &caller,
            NewInternship {
                employer_id: caller.id(),
                role: payload.role,
                description: payload.description,
                deadline: payload.deadline,
                details: payload.details,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InternshipMessage {
            message: "Internship created successfully".to_string(),
            internship,
        }),
    ))
}

pub async fn get_internship(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Internship>, AppError> {
    Ok(Json(state.internships().get_internship(id).await?))
}

pub async fn update_internship(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInternshipRequest>,
) -> Result<Json<InternshipMessage>, AppError> {
    payload.validate()?;

    let internship = state
        .internships()
        .update_internship(&caller, id, payload.into())
        .await?;

    Ok(Json(InternshipMessage {
        message: "Internship updated successfully".to_string(),
        internship,
    }))
}

pub async fn delete_internship(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<i64>,
) -> Result<Json<DeactivationResponse>, AppError> {
    let rejected_applications = state
        .internships()
        .deactivate_internship(&caller, id)
        .await?;

    LOGGER.log_request("DELETE", "/internships/:id", Some(caller.id()), 200);
    Ok(Json(DeactivationResponse {
        message: "Internship deleted successfully".to_string(),
        rejected_applications,
    }))
}

pub async fn list_with_employers(
    State(state): State<AppState>,
) -> Result<Json<Vec<InternshipListing>>, AppError> {
    Ok(Json(state.internships().list_with_employers().await?))
}

pub async fn list_by_employer(
    State(state): State<AppState>,
    Path(employer_id): Path<i64>,
) -> Result<Json<Vec<Internship>>, AppError> {
    Ok(Json(state.internships().list_by_employer(employer_id).await?))
}

pub async fn roles_by_employer(
    State(state): State<AppState>,
    Path(employer_id): Path<i64>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.internships().roles_by_employer(employer_id).await?))
}
