use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    AppState,
    db::Store,
    dtos::{
        ArticleDetailDto, ArticleListItemDto, ArticleQueryParams, AuthorDto, DataResponse,
        ListResponse, RelatedArticleDto,
    },
    error::{ErrorMessage, HttpError},
    filters::ArticleFilter,
    markdown,
    models::Article,
};

/// Number of related entries attached to an article page
pub const RELATED_LIMIT: i64 = 3;

/// News feed, mounted at `/api/actualites`
pub fn article_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(get_articles).options(get_article_facets))
        .route("/facets", get(get_article_facets))
        .route("/{slug}", get(get_article))
}

#[instrument(skip(app_state))]
pub async fn get_articles(
    WithRejection(Query(params), _): WithRejection<Query<ArticleQueryParams>, HttpError>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = ArticleFilter::from_params(&params, Utc::now());

    let (articles, total) = app_state
        .db_client
        .list_articles(&filter)
        .await
        .map_err(|e| HttpError::from_store("list", "article", e))?;

    Ok(Json(ListResponse {
        success: true,
        data: articles.iter().map(ArticleListItemDto::from_article).collect(),
        total,
        page: filter.pagination.page,
        limit: filter.pagination.limit,
        total_pages: filter.pagination.total_pages(total),
    }))
}

/// Categories of the articles the public can currently read
#[instrument(skip(app_state))]
pub async fn get_article_facets(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state
        .db_client
        .article_category_facets(Utc::now())
        .await
        .map_err(|e| HttpError::from_store("facets", "article", e))?;

    Ok(Json(DataResponse::new(categories)))
}

/// Look an article up by slug as the public sees it at `now`
///
/// Drafts and future-dated articles come back as `None`, exactly like a slug
/// that does not exist.
pub async fn resolve_article(
    store: &dyn Store,
    slug: &str,
    now: DateTime<Utc>,
) -> Result<Option<Article>, HttpError> {
    let article = store
        .get_article_by_slug(slug)
        .await
        .map_err(|e| HttpError::from_store("get", "article", e))?;

    Ok(article.filter(|article| article.is_visible_at(now)))
}

#[instrument(skip(app_state))]
pub async fn get_article(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let now = Utc::now();

    let article = resolve_article(app_state.db_client.as_ref(), &slug, now)
        .await?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let related = app_state
        .db_client
        .related_articles(&article, now, RELATED_LIMIT)
        .await
        .map_err(|e| HttpError::from_store("related", "article", e))?;

    let content_html = markdown::to_html(&article.content);

    Ok(Json(DataResponse::new(ArticleDetailDto {
        id: article.id,
        title: article.title,
        slug: article.slug,
        excerpt: article.excerpt,
        content: article.content,
        content_html,
        image_url: article.image_url,
        category: article.category,
        tags: article.tags,
        is_published: article.is_published,
        is_featured: article.is_featured,
        published_at: article.published_at,
        created_at: article.created_at,
        updated_at: article.updated_at,
        author: AuthorDto {
            name: article.author_name,
        },
        related_articles: related.iter().map(RelatedArticleDto::from_article).collect(),
    })))
}
