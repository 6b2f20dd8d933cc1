//! Contact form intake: shape selection, validation, anti-abuse verification
//! and the notification port.
//!
//! A submission is a tagged union. The `type` field picks the shape, the
//! shape is validated on its own, and the resulting `ContactSubmission` is
//! what gets stored and notified. Fields that belong to the other shape are
//! never read.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

use crate::dtos::{IndividualContactDto, MerchantContactDto};
use crate::error::{FieldError, field_errors};
use crate::models::{ContactKind, ContactMessage};

/// Lowest score the verifier may return for a submission to be accepted
pub const MIN_SCORE: f64 = 0.5;

const WRONG_TYPE: &str = "Type de valeur invalide";

/// A validated contact submission
#[derive(Debug, Clone, PartialEq)]
pub enum ContactSubmission {
    Individual(IndividualContactDto),
    Merchant(MerchantContactDto),
}

impl ContactSubmission {
    pub fn kind(&self) -> ContactKind {
        match self {
            ContactSubmission::Individual(_) => ContactKind::Individual,
            ContactSubmission::Merchant(_) => ContactKind::Merchant,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ContactSubmission::Individual(form) => &form.name,
            ContactSubmission::Merchant(form) => &form.name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            ContactSubmission::Individual(form) => &form.email,
            ContactSubmission::Merchant(form) => &form.email,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ContactSubmission::Individual(form) => &form.message,
            ContactSubmission::Merchant(form) => &form.message,
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        match self {
            ContactSubmission::Individual(_) => None,
            ContactSubmission::Merchant(form) => Some(&form.company_name),
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            ContactSubmission::Individual(_) => None,
            ContactSubmission::Merchant(form) => Some(&form.phone),
        }
    }

    pub fn position(&self) -> Option<&str> {
        match self {
            ContactSubmission::Individual(_) => None,
            ContactSubmission::Merchant(form) => form
                .position
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty()),
        }
    }
}

/// Pick the shape from `type` and validate the body against it
///
/// Every problem is reported at once, sorted by field name.
pub fn parse_submission(body: &Value) -> Result<ContactSubmission, Vec<FieldError>> {
    let kind = body.get("type").and_then(Value::as_str);

    match kind {
        Some("PARTICULIER") => {
            validated::<IndividualContactDto>(body).map(ContactSubmission::Individual)
        }
        Some("COMMERCANT") => validated::<MerchantContactDto>(body).map(ContactSubmission::Merchant),
        _ => Err(vec![FieldError::new(
            "type",
            "Le type doit être PARTICULIER ou COMMERCANT",
        )]),
    }
}

fn validated<T>(body: &Value) -> Result<T, Vec<FieldError>>
where
    T: DeserializeOwned + Validate,
{
    let form: T = serde_path_to_error::deserialize(body).map_err(|e| {
        let path = e.path().to_string();
        // "." is the document root, which is not an object
        let field = if path == "." { "body".to_string() } else { path };
        vec![FieldError::new(field, WRONG_TYPE)]
    })?;

    form.validate().map_err(|e| field_errors(&e))?;
    Ok(form)
}

/// The anti-abuse token, when the client sent a non-empty one
pub fn abuse_token(body: &Value) -> Option<&str> {
    body.get("recaptchaToken")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Answer of the anti-abuse service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub success: bool,
    pub score: f64,
}

impl Verdict {
    pub fn passes(&self) -> bool {
        self.success && self.score >= MIN_SCORE
    }
}

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verification service unreachable: {0}")]
    Transport(String),

    #[error("unexpected verification response: {0}")]
    Response(String),
}

/// Port to the anti-abuse (score based captcha) service
#[async_trait]
pub trait AbuseVerifier: Send + Sync {
    /// `false` when verification is switched off and every submission passes
    fn enabled(&self) -> bool {
        true
    }

    async fn verify(&self, token: &str) -> Result<Verdict, VerifierError>;
}

/// Used when no secret is configured
pub struct DisabledVerifier;

#[async_trait]
impl AbuseVerifier for DisabledVerifier {
    fn enabled(&self) -> bool {
        false
    }

    async fn verify(&self, _token: &str) -> Result<Verdict, VerifierError> {
        tracing::warn!("anti-abuse verification is disabled, accepting submission unchecked");
        Ok(Verdict {
            success: true,
            score: 1.0,
        })
    }
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Port used to tell the team a message arrived
#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify(&self, message: &ContactMessage) -> Result<(), NotifyError>;
}

/// Notifier for setups without SMTP: the message is only logged
pub struct LogNotifier;

#[async_trait]
impl ContactNotifier for LogNotifier {
    async fn notify(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        tracing::info!(
            id = %message.id,
            kind = message.kind.as_str(),
            "contact message received (email notification not configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn individual_extra_fields_are_dropped() {
        let body = json!({
            "type": "PARTICULIER",
            "name": "Marie Hoarau",
            "email": "marie@example.re",
            "message": "Où se trouve la borne la plus proche ?",
            "companyName": "Should not be kept",
            "phone": "0692000000"
        });
        let submission = parse_submission(&body).unwrap();
        assert_eq!(submission.kind(), ContactKind::Individual);
        assert_eq!(submission.company_name(), None);
        assert_eq!(submission.phone(), None);
    }

    #[test]
    fn merchant_missing_phone_is_a_field_error() {
        let body = json!({
            "type": "COMMERCANT",
            "companyName": "Boulangerie du Port",
            "name": "Jean Payet",
            "email": "jean@example.re",
            "message": "Nous souhaitons devenir partenaires."
        });
        let errors = parse_submission(&body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "phone");
    }

    #[test]
    fn every_field_error_is_reported_sorted() {
        let body = json!({ "type": "PARTICULIER", "name": "M", "email": "nope", "message": "court" });
        let errors = parse_submission(&body).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "message", "name"]);
    }

    #[test]
    fn wrongly_typed_field_is_named() {
        let body = json!({
            "type": "COMMERCANT",
            "companyName": "Boulangerie du Port",
            "name": "Jean Payet",
            "email": "jean@example.re",
            "phone": 692000000,
            "message": "Nous souhaitons devenir partenaires."
        });
        assert_eq!(
            parse_submission(&body).unwrap_err(),
            vec![FieldError::new("phone", "Type de valeur invalide")]
        );

        let body = json!({ "type": "PARTICULIER", "name": null, "email": "a@b.re", "message": "Bonjour à tous !" });
        assert_eq!(parse_submission(&body).unwrap_err()[0].field, "name");
    }

    #[test]
    fn unknown_type_is_reported_on_type() {
        for body in [json!({ "type": "ENTREPRISE" }), json!({ "name": "Marie" })] {
            let errors = parse_submission(&body).unwrap_err();
            assert_eq!(errors, vec![FieldError::new("type", "Le type doit être PARTICULIER ou COMMERCANT")]);
        }
    }

    #[test]
    fn blank_position_is_stored_as_null() {
        let body = json!({
            "type": "COMMERCANT",
            "companyName": "Boulangerie du Port",
            "name": "Jean Payet",
            "position": "  ",
            "email": "jean@example.re",
            "phone": "0262 00 00 00",
            "message": "Nous souhaitons devenir partenaires."
        });
        let submission = parse_submission(&body).unwrap();
        assert_eq!(submission.position(), None);
        assert_eq!(submission.phone(), Some("0262 00 00 00"));
    }

    #[test]
    fn empty_token_counts_as_absent() {
        assert_eq!(abuse_token(&json!({ "recaptchaToken": "" })), None);
        assert_eq!(abuse_token(&json!({})), None);
        assert_eq!(abuse_token(&json!({ "recaptchaToken": "abc" })), Some("abc"));
    }

    #[test]
    fn verdict_needs_success_and_score() {
        assert!(Verdict { success: true, score: 0.5 }.passes());
        assert!(!Verdict { success: true, score: 0.49 }.passes());
        assert!(!Verdict { success: false, score: 0.9 }.passes());
    }
}
