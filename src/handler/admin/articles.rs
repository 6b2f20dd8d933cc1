use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use tracing::instrument;
use validator::Validate;

use super::{deleted, parse_id};
use crate::{
    AppState,
    dtos::{AdminArticlesDto, ArticleInput, DataResponse},
    error::{ErrorMessage, FieldError, HttpError, field_errors},
    middleware::AdminSession,
    models::Article,
    utils::slug::slugify,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/actualites", get(list_articles).post(create_article))
        .route(
            "/actualites/{article_id}",
            put(update_article).delete(delete_article),
        )
}

/// Drafts and scheduled articles included, newest first
#[instrument(skip_all)]
pub async fn list_articles(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let articles = app_state
        .db_client
        .all_articles()
        .await
        .map_err(|e| HttpError::from_store("admin list", "article", e))?;

    let published_count = articles.iter().filter(|a| a.is_published).count();
    let draft_count = articles.len() - published_count;

    Ok(Json(DataResponse::new(AdminArticlesDto {
        articles,
        published_count,
        draft_count,
    })))
}

fn slug_error(message: impl Into<String>) -> HttpError {
    HttpError::validation(vec![FieldError::new("slug", message)])
}

/// Slug for a new article: the given one, else derived from the title
fn new_slug(body: &ArticleInput) -> Result<String, HttpError> {
    let slug = match body.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slugify(slug),
        _ => slugify(&body.title),
    };
    if slug.is_empty() {
        return Err(slug_error("Slug invalide"));
    }
    Ok(slug)
}

/// Slug after an update
///
/// An omitted slug keeps the current one. Once published, an article keeps
/// its URL.
fn updated_slug(current: &Article, body: &ArticleInput) -> Result<String, HttpError> {
    let requested = match body.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slugify(slug),
        _ => return Ok(current.slug.clone()),
    };
    if requested.is_empty() {
        return Err(slug_error("Slug invalide"));
    }
    if requested != current.slug && current.is_published {
        return Err(slug_error(ErrorMessage::SlugLocked.to_string()));
    }
    Ok(requested)
}

/// Publishing without a date stamps the first publication time
fn stamp_publication(
    mut body: ArticleInput,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ArticleInput {
    if body.is_published && body.published_at.is_none() {
        body.published_at = Some(previous.unwrap_or(now));
    }
    body
}

#[instrument(skip(app_state, session, body), fields(author = %session.user.id, title = %body.title))]
pub async fn create_article(
    State(app_state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    WithRejection(Json(body), _): WithRejection<Json<ArticleInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;
    let slug = new_slug(&body)?;
    let body = stamp_publication(body, None, Utc::now());

    let article = app_state
        .db_client
        .create_article(session.user.id, &slug, &body)
        .await
        .map_err(|e| HttpError::from_store("create", "article", e))?;

    tracing::info!(article_id = %article.id, slug = %article.slug, "article created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(article))))
}

#[instrument(skip(app_state, body))]
pub async fn update_article(
    Path(article_id): Path<String>,
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<ArticleInput>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let article_id = parse_id(&article_id, ErrorMessage::ArticleNotFound)?;
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let current = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| HttpError::from_store("update", "article", e))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let slug = updated_slug(&current, &body)?;
    let body = stamp_publication(body, current.published_at, Utc::now());

    let article = app_state
        .db_client
        .update_article(article_id, &slug, &body)
        .await
        .map_err(|e| HttpError::from_store("update", "article", e))?;

    Ok(Json(DataResponse::new(article)))
}

#[instrument(skip(app_state))]
pub async fn delete_article(
    Path(article_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let article_id = parse_id(&article_id, ErrorMessage::ArticleNotFound)?;

    app_state
        .db_client
        .delete_article(article_id)
        .await
        .map_err(|e| HttpError::from_store("delete", "article", e))?;

    tracing::info!(%article_id, "article deleted");
    Ok(deleted("Article supprimé"))
}
