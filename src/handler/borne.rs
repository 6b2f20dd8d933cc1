use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{BorneDetailDto, BorneDto, BorneQueryParams, DataResponse, ListResponse},
    error::{ErrorMessage, HttpError},
    filters::BorneFilter,
};

/// Public collection points, mounted at `/api/bornes`
pub fn borne_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_bornes).options(get_borne_facets))
        .route("/facets", get(get_borne_facets))
        .route("/{borne_id}", get(get_borne))
}

#[instrument(skip(app_state))]
pub async fn get_bornes(
    WithRejection(Query(params), _): WithRejection<Query<BorneQueryParams>, HttpError>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = BorneFilter::from_params(&params);
    let pagination = filter.pagination();

    let (bornes, total) = app_state
        .db_client
        .list_bornes(&filter)
        .await
        .map_err(|e| HttpError::from_store("list", "borne", e))?;

    Ok(Json(ListResponse {
        success: true,
        data: BorneDto::from_bornes(&bornes),
        total,
        page: pagination.page,
        limit: pagination.limit,
        total_pages: pagination.total_pages(total),
    }))
}

/// City drop-down for the map filters
#[instrument(skip(app_state))]
pub async fn get_borne_facets(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let cities = app_state
        .db_client
        .borne_city_facets()
        .await
        .map_err(|e| HttpError::from_store("facets", "borne", e))?;

    Ok(Json(DataResponse::new(cities)))
}

#[instrument(skip(app_state))]
pub async fn get_borne(
    Path(borne_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    // a malformed id cannot name an existing borne
    let Ok(borne_id) = Uuid::parse_str(&borne_id) else {
        return Err(HttpError::not_found(ErrorMessage::BorneNotFound.to_string()));
    };

    let borne = app_state
        .db_client
        .get_borne(borne_id)
        .await
        .map_err(|e| HttpError::from_store("get", "borne", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::BorneNotFound.to_string()))?;

    Ok(Json(DataResponse::new(BorneDetailDto {
        borne: BorneDto::from_borne(&borne),
        created_at: borne.created_at,
        updated_at: borne.updated_at,
    })))
}
