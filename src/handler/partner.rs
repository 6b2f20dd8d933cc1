use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use crate::{
    AppState,
    dtos::{DataResponse, ListResponse, PartnerDto, PartnerQueryParams},
    error::{ErrorMessage, HttpError},
    filters::PartnerFilter,
};

/// Partner directory, mounted at `/api/partenaires`
pub fn partner_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_partners).options(get_partner_facets))
        .route("/facets", get(get_partner_facets))
        .route("/{slug}", get(get_partner))
}

#[instrument(skip(app_state))]
pub async fn get_partners(
    WithRejection(Query(params), _): WithRejection<Query<PartnerQueryParams>, HttpError>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = PartnerFilter::from_params(&params);
    let pagination = filter.pagination();

    let (partners, total) = app_state
        .db_client
        .list_partners(&filter)
        .await
        .map_err(|e| HttpError::from_store("list", "partner", e))?;

    Ok(Json(ListResponse {
        success: true,
        data: PartnerDto::from_partners(&partners),
        total,
        page: pagination.page,
        limit: pagination.limit,
        total_pages: pagination.total_pages(total),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_partner_facets(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let facets = app_state
        .db_client
        .partner_facets()
        .await
        .map_err(|e| HttpError::from_store("facets", "partner", e))?;

    Ok(Json(DataResponse::new(facets)))
}

#[instrument(skip(app_state))]
pub async fn get_partner(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let partner = app_state
        .db_client
        .get_partner_by_slug(&slug)
        .await
        .map_err(|e| HttpError::from_store("get", "partner", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::PartnerNotFound.to_string()))?;

    Ok(Json(DataResponse::new(PartnerDto::from_partner(&partner))))
}
