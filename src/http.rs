use async_trait::async_trait;
use serde::Deserialize;

use crate::intake::{AbuseVerifier, Verdict, VerifierError};

/// reCAPTCHA v3 client
///
/// Sends the client token with the server secret to the siteverify endpoint
/// and reads back the pass/fail flag and the score.
///
/// Cloning is cheap because reqwest::Client uses Arc internally
#[derive(Clone)]
pub struct RecaptchaVerifier {
    conn: reqwest::Client,
    verify_url: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    // v2 answers carry no score; treat them as a zero score
    #[serde(default)]
    score: f64,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl RecaptchaVerifier {
    pub fn new(conn: reqwest::Client, verify_url: String, secret: String) -> Self {
        Self {
            conn,
            verify_url,
            secret,
        }
    }
}

#[async_trait]
impl AbuseVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<Verdict, VerifierError> {
        let response = self
            .conn
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| VerifierError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifierError::Response(format!(
                "status {}",
                response.status()
            )));
        }

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| VerifierError::Response(e.to_string()))?;

        if !body.error_codes.is_empty() {
            tracing::debug!(errors = ?body.error_codes, "verifier reported errors");
        }

        Ok(Verdict {
            success: body.success,
            score: body.score,
        })
    }
}
