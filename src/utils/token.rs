use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};
use crate::models::UserRole;

/// Admin session claims: subject is the user id
///
/// The role is embedded for the client's convenience only; the middleware
/// reloads the user and trusts the stored role.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    role: UserRole,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let claims = AdminClaims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Verify signature and expiry, return the claims
pub fn decode_token(token: impl Into<String>, secret: &[u8]) -> Result<AdminClaims, HttpError> {
    decode::<AdminClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let token = create_token("6f1c", UserRole::Editor, SECRET, 60).unwrap();
        let claims = decode_token(token, SECRET).unwrap();
        assert_eq!(claims.sub, "6f1c");
        assert_eq!(claims.role, UserRole::Editor);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token("6f1c", UserRole::Admin, SECRET, 60).unwrap();
        let err = decode_token(token, b"other-secret").unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_token_is_rejected() {
        // beyond the default 60s leeway
        let token = create_token("6f1c", UserRole::Admin, SECRET, -3600).unwrap();
        assert!(decode_token(token, SECRET).is_err());
    }

    #[test]
    fn empty_subject_is_refused() {
        assert!(create_token("", UserRole::Admin, SECRET, 60).is_err());
    }
}
