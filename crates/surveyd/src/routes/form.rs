//! Survey submission endpoint.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use crate::respond;
use crate::state::AppState;
use survey_common::{SurveyError, SurveyForm};

#[derive(Serialize)]
struct SubmitResponse {
    message: &'static str,
    key: Uuid,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// CORS preflight. No verification, validation, or storage.
pub async fn preflight() -> Response {
    respond::no_content()
}

/// Accept one survey answer: verify the Turnstile token, validate the
/// fields, store the record, and return the minted key.
pub async fn submit(
    State(state): State<AppState>,
    form: Result<Form<SurveyForm>, FormRejection>,
) -> Response {
    match process(&state, form).await {
        Ok(key) => respond::json(
            StatusCode::OK,
            SubmitResponse {
                message: "survey answer saved",
                key,
            },
        ),
        Err(err) => reject(err),
    }
}

/// Any verb other than POST/OPTIONS on the endpoint.
pub async fn method_not_allowed() -> Response {
    reject(SurveyError::MethodNotAllowed)
}

/// The submission pipeline: verify, then validate, then store.
/// Strictly sequential; at most one verification call and one store
/// write per request.
async fn process(
    state: &AppState,
    form: Result<Form<SurveyForm>, FormRejection>,
) -> Result<Uuid, SurveyError> {
    let Form(form) = form.map_err(|e| SurveyError::Malformed(e.to_string()))?;

    // Token guard before any verification traffic
    let token = form
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(SurveyError::MissingToken)?;

    let outcome = state.verifier.verify(token).await?;
    if !outcome.success {
        return Err(SurveyError::CaptchaRejected);
    }

    let record = form.into_record()?;
    state.store.put(&record).await
}

/// Map an error to its response. Unexpected conditions are logged with
/// detail; the client only ever sees the public message.
fn reject(err: SurveyError) -> Response {
    match &err {
        SurveyError::Storage(detail) => {
            tracing::error!(%detail, "survey answer write failed");
        }
        SurveyError::Malformed(detail) => {
            tracing::error!(%detail, "unprocessable submission");
        }
        _ => {
            tracing::debug!(error = %err, "submission rejected");
        }
    }

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    respond::json(status, ErrorResponse {
        error: err.public_message(),
    })
}
