use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

use crate::db::StoreError;

/// Error response structure sent to clients
///
/// Every failure leaves the API in the same envelope the successful
/// responses use, with `success` set to false:
/// ```text
/// {
///   "success": false,
///   "error": "Données invalides",
///   "details": [{ "field": "phone", "message": "..." }]
/// }
/// ```
///
/// `details` is only present for validation failures so the client can
/// highlight the offending inputs.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// A single rejected input
///
/// `field` uses the JSON (camelCase) name the client sent, not the Rust one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Flatten `validator` output into field errors, sorted by field name
///
/// Nested struct and list errors are not used by our DTOs; only direct field
/// errors are reported.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter().map(move |err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                FieldError::new(field.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// User-facing error texts
///
/// The public site is French, so are its error messages.
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    // Input
    InvalidData,
    InvalidJson,
    InvalidQuery,
    VerificationFailed,

    // Lookup
    BorneNotFound,
    PartnerNotFound,
    ArticleNotFound,
    MessageNotFound,
    SlugAlreadyUsed,
    SlugLocked,

    // Password handling
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,

    // Authentication
    InvalidCredentials,
    InvalidToken,
    TokenNotProvided,
    UserNotAuthenticated,
    UserNoLongerExist,
    PermissionDenied,

    MethodNotAllowed,
    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::InvalidData => "Données invalides".to_string(),
            ErrorMessage::InvalidJson => "Corps de requête JSON invalide".to_string(),
            ErrorMessage::InvalidQuery => "Paramètres de requête invalides".to_string(),
            ErrorMessage::VerificationFailed => "Vérification anti-spam échouée".to_string(),
            ErrorMessage::BorneNotFound => "Borne non trouvée".to_string(),
            ErrorMessage::PartnerNotFound => "Partenaire non trouvé".to_string(),
            ErrorMessage::ArticleNotFound => "Article non trouvé".to_string(),
            ErrorMessage::MessageNotFound => "Message non trouvé".to_string(),
            ErrorMessage::SlugAlreadyUsed => "Ce slug est déjà utilisé".to_string(),
            ErrorMessage::SlugLocked => {
                "Le slug d'un article publié ne peut pas être modifié".to_string()
            }
            ErrorMessage::EmptyPassword => "Le mot de passe ne peut pas être vide".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Le mot de passe ne doit pas dépasser {} caractères", max_length)
            }
            ErrorMessage::InvalidHashFormat => "Format de hash invalide".to_string(),
            ErrorMessage::HashingError => "Erreur lors du hachage du mot de passe".to_string(),
            ErrorMessage::InvalidCredentials => "Email ou mot de passe incorrect".to_string(),
            ErrorMessage::InvalidToken => "Session invalide ou expirée".to_string(),
            ErrorMessage::TokenNotProvided => "Vous n'êtes pas connecté".to_string(),
            ErrorMessage::UserNotAuthenticated => "Authentification requise".to_string(),
            ErrorMessage::UserNoLongerExist => {
                "L'utilisateur de cette session n'existe plus".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "Vous n'êtes pas autorisé à effectuer cette action".to_string()
            }
            ErrorMessage::MethodNotAllowed => "Method not allowed".to_string(),
            ErrorMessage::ServerError => "Une erreur est survenue".to_string(),
        };
        write!(f, "{}", message)
    }
}

/// Internal HTTP error type used throughout the handlers
///
/// Handlers return `Result<T, HttpError>`; axum turns the error into the JSON
/// failure envelope through `IntoResponse`. The status code travels with the
/// message so they can't disagree.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub details: Option<Vec<FieldError>>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            details: None,
        }
    }

    /// 500. The message must never carry store or upstream error text.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    /// 400 with one entry per rejected field
    pub fn validation(details: Vec<FieldError>) -> Self {
        HttpError {
            message: ErrorMessage::InvalidData.to_string(),
            status: StatusCode::BAD_REQUEST,
            details: Some(details),
        }
    }

    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::CONFLICT)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::UNAUTHORIZED)
    }

    /// 403. Also used when the anti-abuse verifier rejects a submission.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            ErrorMessage::MethodNotAllowed.to_string(),
            StatusCode::METHOD_NOT_ALLOWED,
        )
    }

    /// Convert a store failure at the handler boundary
    ///
    /// Backend failures are logged with the operation and entity kind and
    /// leave the API as a generic 500. `NotFound` and `Conflict` keep their
    /// meaning.
    pub fn from_store(operation: &str, entity: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => {
                tracing::info!(operation, entity, "record not found");
                HttpError::not_found(not_found_message(entity))
            }
            StoreError::Conflict(constraint) => {
                tracing::warn!(operation, entity, %constraint, "unique constraint violated");
                HttpError::unique_constraint_violation(ErrorMessage::SlugAlreadyUsed.to_string())
            }
            StoreError::Backend(e) => {
                tracing::error!(operation, entity, error = %e, "store failure");
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            success: false,
            error: self.message,
            details: self.details,
        });

        (self.status, json_response).into_response()
    }
}

fn not_found_message(entity: &str) -> String {
    match entity {
        "borne" => ErrorMessage::BorneNotFound,
        "partner" => ErrorMessage::PartnerNotFound,
        "article" => ErrorMessage::ArticleNotFound,
        "contact_message" => ErrorMessage::MessageNotFound,
        _ => ErrorMessage::ServerError,
    }
    .to_string()
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Body extractor failures (syntax, content type, shape) as a JSON 400
impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::info!(error = %rejection.body_text(), "rejected request body");
        HttpError::bad_request(ErrorMessage::InvalidJson.to_string())
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::info!(error = %rejection.body_text(), "rejected query string");
        HttpError::bad_request(ErrorMessage::InvalidQuery.to_string())
    }
}

/// Fallback for verbs a route does not serve
pub async fn method_not_allowed() -> HttpError {
    HttpError::method_not_allowed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 2, message = "trop court"))]
        company_name: String,
        #[validate(email(message = "Email invalide"))]
        email: String,
    }

    #[test]
    fn validation_errors_use_json_field_names() {
        let form = Form {
            company_name: "x".into(),
            email: "nope".into(),
        };
        let errors = form.validate().unwrap_err();
        let details = field_errors(&errors);
        assert_eq!(
            details,
            vec![
                FieldError::new("companyName", "trop court"),
                FieldError::new("email", "Email invalide"),
            ]
        );
    }

    #[test]
    fn backend_errors_do_not_leak() {
        let err = HttpError::from_store(
            "list",
            "borne",
            StoreError::Backend(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, ErrorMessage::ServerError.to_string());
    }

    #[test]
    fn not_found_keeps_entity_message() {
        let err = HttpError::from_store("get", "partner", StoreError::NotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Partenaire non trouvé");
    }
}
