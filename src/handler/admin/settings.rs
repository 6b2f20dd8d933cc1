use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    dtos::{DataResponse, SiteConfigUpdateDto, StatisticsInput},
    error::{FieldError, HttpError, field_errors},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/parametres", get(get_settings).put(update_settings))
        .route("/statistiques", post(record_statistics))
}

#[instrument(skip_all)]
pub async fn get_settings(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let entries = app_state
        .db_client
        .get_site_config()
        .await
        .map_err(|e| HttpError::from_store("list", "site_config", e))?;

    Ok(Json(DataResponse::new(entries)))
}

/// Field errors of every entry, reported as `entries[i].field`
fn entry_errors(body: &SiteConfigUpdateDto) -> Vec<FieldError> {
    body.entries
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| match entry.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e)
                .into_iter()
                .map(|err| FieldError::new(format!("entries[{i}].{}", err.field), err.message))
                .collect(),
        })
        .collect()
}

#[instrument(skip_all, fields(entries = body.entries.len()))]
pub async fn update_settings(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<SiteConfigUpdateDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let errors = entry_errors(&body);
    if !errors.is_empty() {
        return Err(HttpError::validation(errors));
    }

    let entries = app_state
        .db_client
        .upsert_site_config(&body.entries)
        .await
        .map_err(|e| HttpError::from_store("upsert", "site_config", e))?;

    tracing::info!(count = entries.len(), "site config updated");
    Ok(Json(DataResponse::new(entries)))
}

#[instrument(skip(app_state, body), fields(year = body.year, month = body.month))]
pub async fn record_statistics(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<StatisticsInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let snapshot = app_state
        .db_client
        .record_statistics(&body)
        .await
        .map_err(|e| HttpError::from_store("record", "statistics", e))?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(snapshot))))
}
