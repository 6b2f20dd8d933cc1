use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
};
use axum_extra::extract::WithRejection;
use tracing::instrument;

use super::{deleted, parse_id};
use crate::{
    AppState,
    dtos::{AdminMessagesDto, DataResponse, MessageFlagsDto},
    error::{ErrorMessage, HttpError},
    models::ContactKind,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages))
        .route(
            "/messages/{message_id}",
            patch(update_message).delete(delete_message),
        )
}

#[instrument(skip_all)]
pub async fn list_messages(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .db_client
        .list_contact_messages()
        .await
        .map_err(|e| HttpError::from_store("admin list", "contact_message", e))?;

    let unread_count = messages.iter().filter(|m| !m.is_read).count();
    let individual_count = messages
        .iter()
        .filter(|m| m.kind == ContactKind::Individual)
        .count();
    let merchant_count = messages.len() - individual_count;

    Ok(Json(DataResponse::new(AdminMessagesDto {
        messages,
        unread_count,
        individual_count,
        merchant_count,
    })))
}

/// Toggle `isRead` / `isArchived`; omitted flags stay as they are
#[instrument(skip(app_state))]
pub async fn update_message(
    Path(message_id): Path<String>,
    State(app_state): State<AppState>,
    WithRejection(Json(flags), _): WithRejection<Json<MessageFlagsDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    let message_id = parse_id(&message_id, ErrorMessage::MessageNotFound)?;

    let message = app_state
        .db_client
        .update_message_flags(message_id, &flags)
        .await
        .map_err(|e| HttpError::from_store("update", "contact_message", e))?;

    Ok(Json(DataResponse::new(message)))
}

#[instrument(skip(app_state))]
pub async fn delete_message(
    Path(message_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let message_id = parse_id(&message_id, ErrorMessage::MessageNotFound)?;

    app_state
        .db_client
        .delete_contact_message(message_id)
        .await
        .map_err(|e| HttpError::from_store("delete", "contact_message", e))?;

    Ok(deleted("Message supprimé"))
}
