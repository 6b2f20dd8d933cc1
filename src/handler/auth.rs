use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::{
    WithRejection,
    cookie::{Cookie, CookieJar, SameSite},
};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    config::AppEnv,
    dtos::{FilterUserDto, LoginAdminDto, LoginResponseDto, MessageResponse},
    error::{ErrorMessage, HttpError, field_errors},
    middleware::SESSION_COOKIE,
    utils::{password, token},
};

/// Back-office session endpoints, mounted at `/api/admin`
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn session_cookie(app_state: &AppState, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.env.app_env == AppEnv::Production)
        .max_age(max_age)
        .build()
}

/// Log a back-office user in
///
/// Unknown email and wrong password get the same 401 so the endpoint does
/// not reveal which accounts exist.
#[instrument(skip(app_state, cookie_jar, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginAdminDto>, HttpError>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::validation(field_errors(&e)))?;

    let invalid = || HttpError::unauthorized(ErrorMessage::InvalidCredentials.to_string());

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| HttpError::from_store("login", "user", e))?
        .ok_or_else(|| {
            tracing::info!("login attempt for unknown account");
            invalid()
        })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::warn!(user_id = %user.id, "password check failed: {}", e);
        invalid()
    })?;

    if !password_matched {
        tracing::info!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }

    let access_token = token::create_token(
        &user.id.to_string(),
        user.role,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let cookie = session_cookie(
        &app_state,
        access_token.clone(),
        time::Duration::seconds(app_state.env.jwt_maxage),
    );

    tracing::info!(user_id = %user.id, role = user.role.to_str(), "login successful");

    Ok((
        cookie_jar.add(cookie),
        Json(LoginResponseDto {
            success: true,
            access_token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Expire the session cookie
#[instrument(skip_all)]
pub async fn logout(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
) -> impl IntoResponse {
    let cookie = session_cookie(&app_state, String::new(), time::Duration::ZERO);

    (
        cookie_jar.add(cookie),
        Json(MessageResponse {
            success: true,
            message: "Déconnexion réussie".to_string(),
            id: None,
        }),
    )
}
