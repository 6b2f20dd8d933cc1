use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Name of the cookie carrying the admin session JWT
pub const SESSION_COOKIE: &str = "admin_token";

/// Authenticated back-office user, inserted into the request extensions by
/// `auth`
///
/// ```ignore
/// async fn handler(Extension(session): Extension<AdminSession>) { /* session.user */ }
/// ```
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: User,
}

/// Session token from the `admin_token` cookie, else from
/// `Authorization: Bearer <token>`
fn session_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
    cookie_jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
}

/// Authentication middleware for `/api/admin`
///
/// Validates the JWT, then reloads the account so a deleted user or a
/// changed role takes effect immediately.
///
/// # Errors
/// 401 when the token is missing, invalid or expired, or when its user no
/// longer exists.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = session_token(&cookie_jar, &req)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user(Some(user_id), None)
        .await
        .map_err(|e| HttpError::from_store("authenticate", "user", e))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut().insert(AdminSession { user });

    Ok(next.run(req).await)
}

/// Role gate, to be layered after `auth`
///
/// # Errors
/// 401 without a session, 403 when the user's role is not in `required_roles`.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let session = req
        .extensions()
        .get::<AdminSession>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&session.user.role) {
        tracing::warn!(
            user_id = %session.user.id,
            role = session.user.role.to_str(),
            path = %req.uri().path(),
            "role not allowed"
        );
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    Ok(next.run(req).await)
}
