//! Back-office API, mounted at `/api/admin` behind the `auth` middleware.
//!
//! Articles are open to editors; everything else requires an admin.

mod articles;
mod bornes;
mod messages;
mod partners;
mod settings;

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    AppState,
    dtos::{DashboardDto, DataResponse, MessageResponse},
    error::{ErrorMessage, HttpError},
    filters::{ArticleFilter, BorneFilter, Pagination, PartnerFilter, Criterion},
    middleware::{auth, role_check},
    models::UserRole,
};

const RECENT_MESSAGES: usize = 5;

pub fn admin_handler(app_state: AppState) -> Router<AppState> {
    let admin_only = Router::new()
        .route("/dashboard", get(dashboard))
        .merge(bornes::routes())
        .merge(partners::routes())
        .merge(messages::routes())
        .merge(settings::routes())
        .route_layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }));

    let editors = articles::routes().route_layer(middleware::from_fn(|req, next| {
        role_check(req, next, vec![UserRole::Admin, UserRole::Editor])
    }));

    admin_only
        .merge(editors)
        .route_layer(middleware::from_fn_with_state(app_state, auth))
}

/// Path ids that are not UUIDs cannot name a row
fn parse_id(raw: &str, not_found: ErrorMessage) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw).map_err(|_| HttpError::not_found(not_found.to_string()))
}

fn deleted(message: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: message.to_string(),
        id: None,
    })
}

#[instrument(skip_all)]
pub async fn dashboard(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let store = &app_state.db_client;

    let published = ArticleFilter {
        published: Some(true),
        featured: None,
        category: Criterion::Any,
        pagination: Pagination::new(1, 1),
        now: Utc::now(),
    };

    let all_bornes = BorneFilter::everything();
    let all_partners = PartnerFilter::everything();

    let (bornes_count, partners_count, (_, articles_count)) = tokio::try_join!(
        store.count_bornes(&all_bornes),
        store.count_partners(&all_partners),
        store.list_articles(&published),
    )
    .map_err(|e| HttpError::from_store("dashboard", "statistics", e))?;

    let (messages_count, unread_messages_count, messages, stats) = tokio::try_join!(
        store.count_contact_messages(false),
        store.count_contact_messages(true),
        store.list_contact_messages(),
        store.latest_statistics(),
    )
    .map_err(|e| HttpError::from_store("dashboard", "contact_message", e))?;

    Ok(Json(DataResponse::new(DashboardDto {
        bornes_count,
        partners_count,
        articles_count,
        messages_count,
        unread_messages_count,
        recent_messages: messages.into_iter().take(RECENT_MESSAGES).collect(),
        stats,
    })))
}
