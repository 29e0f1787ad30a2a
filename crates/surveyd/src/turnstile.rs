//! Turnstile token verification.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::TurnstileConfig;
use survey_common::{SurveyError, VerifyOutcome};

/// Capability to verify a client-supplied CAPTCHA token.
///
/// The concrete client is swappable; handlers only see this trait.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token against the external service.
    ///
    /// Returns the decoded outcome. A transport-level failure is an
    /// `Err`, never a rejected outcome, so callers can tell "bot
    /// suspected" apart from "verification service unreachable".
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, SurveyError>;
}

/// Cloudflare Turnstile siteverify client
pub struct TurnstileVerifier {
    config: TurnstileConfig,
    http: Client,
}

impl TurnstileVerifier {
    pub fn new(config: TurnstileConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl TokenVerifier for TurnstileVerifier {
    /// Issue one siteverify request. No retries; whatever timeout the
    /// transport defaults to is inherited.
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, SurveyError> {
        // Fail fast before any network I/O
        if token.is_empty() {
            return Err(SurveyError::MissingToken);
        }

        let response = self
            .http
            .post(&self.config.siteverify_url)
            .form(&[
                ("secret", self.config.secret.as_str()),
                ("response", token),
            ])
            .send()
            .await
            .map_err(|e| SurveyError::Malformed(format!("siteverify request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SurveyError::Malformed(format!("siteverify error status: {e}")))?;

        let outcome: VerifyOutcome = response
            .json()
            .await
            .map_err(|e| SurveyError::Malformed(format!("siteverify reply unparsable: {e}")))?;

        if !outcome.success {
            // The secret never appears here; only the service's codes.
            tracing::warn!(error_codes = ?outcome.error_codes, "Turnstile rejected token");
        }

        Ok(outcome)
    }
}

/// Programmable verifier double for router tests.
#[cfg(test)]
pub(crate) struct StubVerifier {
    behavior: StubBehavior,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
pub(crate) enum StubBehavior {
    Pass,
    Reject(Vec<String>),
    Unreachable,
}

#[cfg(test)]
impl StubVerifier {
    pub(crate) fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl TokenVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<VerifyOutcome, SurveyError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if token.is_empty() {
            return Err(SurveyError::MissingToken);
        }
        match &self.behavior {
            StubBehavior::Pass => Ok(VerifyOutcome {
                success: true,
                error_codes: vec![],
            }),
            StubBehavior::Reject(codes) => Ok(VerifyOutcome {
                success: false,
                error_codes: codes.clone(),
            }),
            StubBehavior::Unreachable => {
                Err(SurveyError::Malformed("siteverify request failed".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Form, Json, Router, routing::post};
    use serde_json::json;
    use std::collections::HashMap;

    fn verifier(siteverify_url: String) -> TurnstileVerifier {
        TurnstileVerifier::new(TurnstileConfig {
            secret: "test-secret".into(),
            siteverify_url,
        })
    }

    /// Loopback stand-in for the Turnstile endpoint. Accepts only the
    /// expected form-encoded secret/response pair.
    async fn spawn_siteverify() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = Router::new().route(
            "/turnstile/v0/siteverify",
            post(|Form(params): Form<HashMap<String, String>>| async move {
                let ok = params.get("secret").map(String::as_str) == Some("test-secret")
                    && params.get("response").map(String::as_str) == Some("good-token");
                if ok {
                    Json(json!({ "success": true }))
                } else {
                    Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
                }
            }),
        );

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/turnstile/v0/siteverify")
    }

    #[tokio::test]
    async fn test_empty_token_fails_before_network() {
        // Nothing listens on this port; an attempted call would not
        // come back as MissingToken.
        let verifier = verifier("http://127.0.0.1:9/turnstile/v0/siteverify".into());

        let err = verifier.verify("").await.unwrap_err();
        assert!(matches!(err, SurveyError::MissingToken));
    }

    #[tokio::test]
    async fn test_verify_posts_form_encoded_credentials() {
        let verifier = verifier(spawn_siteverify().await);

        let outcome = verifier.verify("good-token").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.error_codes.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_reports_error_codes() {
        let verifier = verifier(spawn_siteverify().await);

        let outcome = verifier.verify("forged-token").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_codes, vec!["invalid-input-response"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_not_a_rejection() {
        let verifier = verifier("http://127.0.0.1:9/turnstile/v0/siteverify".into());

        let err = verifier.verify("good-token").await.unwrap_err();
        assert!(matches!(err, SurveyError::Malformed(_)));
    }
}
