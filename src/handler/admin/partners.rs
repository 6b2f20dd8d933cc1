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
    dtos::{AdminPartnersDto, DataResponse, PartnerInput},
    error::{ErrorMessage, FieldError, HttpError, field_errors},
    filters::PartnerFilter,
    utils::slug::slugify,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/partenaires", get(list_partners).post(create_partner))
        .route(
            "/partenaires/{partner_id}",
            put(update_partner).delete(delete_partner),
        )
}

#[instrument(skip_all)]
pub async fn list_partners(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let (partners, _) = app_state
        .db_client
        .list_partners(&PartnerFilter::everything())
        .await
        .map_err(|e| HttpError::from_store("admin list", "partner", e))?;

    let active_count = partners.iter().filter(|p| p.is_active).count();
    let featured_count = partners.iter().filter(|p| p.is_featured).count();

    Ok(Json(DataResponse::new(AdminPartnersDto {
        partners,
        active_count,
        featured_count,
    })))
}

/// Explicit slug if given, otherwise derived from the name
fn partner_slug(body: &PartnerInput) -> Result<String, HttpError> {
    let slug = match body.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slugify(slug),
        _ => slugify(&body.name),
    };
    if slug.is_empty() {
        return Err(HttpError::validation(vec![FieldError::new(
            "slug",
            "Slug invalide",
        )]));
    }
    Ok(slug)
}

#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_partner(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<PartnerInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;
    let slug = partner_slug(&body)?;

    let partner = app_state
        .db_client
        .create_partner(&slug, &body)
        .await
        .map_err(|e| HttpError::from_store("create", "partner", e))?;

    tracing::info!(partner_id = %partner.id, slug = %partner.slug, "partner created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(partner))))
}

/// Update every field; a `slug` in the body is ignored
#[instrument(skip(app_state, body))]
pub async fn update_partner(
    Path(partner_id): Path<String>,
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<PartnerInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let partner_id = parse_id(&partner_id, ErrorMessage::PartnerNotFound)?;
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let partner = app_state
        .db_client
        .update_partner(partner_id, &body)
        .await
        .map_err(|e| HttpError::from_store("update", "partner", e))?;

    Ok(Json(DataResponse::new(partner)))
}

#[instrument(skip(app_state))]
pub async fn delete_partner(
    Path(partner_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let partner_id = parse_id(&partner_id, ErrorMessage::PartnerNotFound)?;

    app_state
        .db_client
        .delete_partner(partner_id)
        .await
        .map_err(|e| HttpError::from_store("delete", "partner", e))?;

    tracing::info!(%partner_id, "partner deleted");
    Ok(deleted("Partenaire supprimé"))
}
