use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use axum_extra::extract::WithRejection;
use tracing::instrument;
use validator::Validate;

use super::{deleted, parse_id};
use crate::{
    AppState,
    dtos::{AdminBornesDto, BorneInput, DataResponse},
    error::{ErrorMessage, HttpError, field_errors},
    filters::BorneFilter,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bornes", get(list_bornes).post(create_borne))
        .route("/bornes/{borne_id}", put(update_borne).delete(delete_borne))
}

/// Every borne, retired ones included, by name
#[instrument(skip_all)]
pub async fn list_bornes(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let (bornes, _) = app_state
        .db_client
        .list_bornes(&BorneFilter::everything())
        .await
        .map_err(|e| HttpError::from_store("admin list", "borne", e))?;

    let active_count = bornes.iter().filter(|b| b.status.is_active()).count();
    let inactive_count = bornes.len() - active_count;

    Ok(Json(DataResponse::new(AdminBornesDto {
        bornes,
        active_count,
        inactive_count,
    })))
}

#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_borne(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<BorneInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let borne = app_state
        .db_client
        .create_borne(&body)
        .await
        .map_err(|e| HttpError::from_store("create", "borne", e))?;

    tracing::info!(borne_id = %borne.id, "borne created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(borne))))
}

#[instrument(skip(app_state, body))]
pub async fn update_borne(
    Path(borne_id): Path<String>,
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<BorneInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let borne_id = parse_id(&borne_id, ErrorMessage::BorneNotFound)?;
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let borne = app_state
        .db_client
        .update_borne(borne_id, &body)
        .await
        .map_err(|e| HttpError::from_store("update", "borne", e))?;

    Ok(Json(DataResponse::new(borne)))
}

#[instrument(skip(app_state))]
pub async fn delete_borne(
    Path(borne_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let borne_id = parse_id(&borne_id, ErrorMessage::BorneNotFound)?;

    app_state
        .db_client
        .delete_borne(borne_id)
        .await
        .map_err(|e| HttpError::from_store("delete", "borne", e))?;

    tracing::info!(%borne_id, "borne deleted");
    Ok(deleted("Borne supprimée"))
}
