use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::WithRejection;
use serde_json::Value;
use tracing::instrument;

use crate::{
    AppState,
    dtos::MessageResponse,
    error::{ErrorMessage, HttpError, method_not_allowed},
    intake::{self, ContactSubmission},
};

/// Contact form, mounted at `/api/contact`
pub fn contact_handler() -> Router<AppState> {
    Router::new().route("/", post(submit_contact).fallback(method_not_allowed))
}

/// Validate, verify, store, then notify
///
/// The notification runs after the write and never fails the request.
#[instrument(skip_all)]
pub async fn submit_contact(
    State(app_state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {

    let submission = intake::parse_submission(&body).map_err(|details| {
        tracing::info!(fields = details.len(), "invalid contact submission");
        HttpError::validation(details)
    })?;

    if let Some(token) = intake::abuse_token(&body) {
        verify(&app_state, token).await?;
    }

    let message = app_state
        .db_client
        .save_contact_message(&submission)
        .await
        .map_err(|e| HttpError::from_store("save", "contact_message", e))?;

    tracing::info!(id = %message.id, kind = message.kind.as_str(), "contact message stored");

    if let Err(e) = app_state.notifier.notify(&message).await {
        tracing::error!(id = %message.id, error = %e, "contact notification failed");
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message: confirmation(&submission).to_string(),
            id: Some(message.id),
        }),
    ))
}

async fn verify(app_state: &AppState, token: &str) -> Result<(), HttpError> {
    let rejected = || HttpError::forbidden(ErrorMessage::VerificationFailed.to_string());

    match app_state.verifier.verify(token).await {
        Ok(verdict) if verdict.passes() => Ok(()),
        Ok(verdict) => {
            tracing::warn!(
                success = verdict.success,
                score = verdict.score,
                "contact submission rejected by verifier"
            );
            Err(rejected())
        }
        Err(e) => {
            tracing::error!(error = %e, "verifier call failed");
            Err(rejected())
        }
    }
}

fn confirmation(submission: &ContactSubmission) -> &'static str {
    match submission {
        ContactSubmission::Individual(_) => {
            "Votre message a bien été envoyé. Nous vous répondrons rapidement."
        }
        ContactSubmission::Merchant(_) => {
            "Votre demande de partenariat a bien été envoyée. Notre équipe vous contactera."
        }
    }
}
