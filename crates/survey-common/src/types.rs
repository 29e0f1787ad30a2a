//! Core types shared across surveyd components.

use serde::{Deserialize, Serialize};

use crate::constants::{RATE_MAX, RATE_MIN};
use crate::error::SurveyError;

/// Raw survey fields exactly as submitted by the form.
///
/// Everything arrives string-typed; validation and type coercion
/// happen in [`SurveyForm::into_record`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyForm {
    /// Client-side Turnstile widget token
    #[serde(rename = "cf-turnstile-response")]
    pub token: Option<String>,

    /// Subject being rated
    pub host: Option<String>,

    pub username: Option<String>,

    pub email: Option<String>,

    /// Rating, submitted as an integer string
    pub rate: Option<String>,

    pub comment: Option<String>,
}

impl SurveyForm {
    /// Validate the raw fields into a [`SurveyRecord`].
    ///
    /// Rules apply in order, first failure wins:
    /// 1. `host` must be present and non-empty.
    /// 2. `rate` must parse as an integer in `[RATE_MIN, RATE_MAX]`;
    ///    out-of-range or non-numeric values are rejected, not clamped.
    ///
    /// Optional fields pass through verbatim when non-empty and are
    /// recorded as absent otherwise. An absent field and an empty
    /// string are not the same thing in the record. The timestamp is
    /// stamped server-side when validation completes.
    pub fn into_record(self) -> Result<SurveyRecord, SurveyError> {
        let host = match self.host {
            Some(h) if !h.is_empty() => h,
            _ => return Err(SurveyError::InvalidPayload("host is required")),
        };

        let rate = self
            .rate
            .as_deref()
            .and_then(|r| r.parse::<u8>().ok())
            .filter(|r| (RATE_MIN..=RATE_MAX).contains(r))
            .ok_or(SurveyError::InvalidPayload(
                "rate must be an integer between 1 and 5",
            ))?;

        Ok(SurveyRecord {
            host,
            username: non_empty(self.username),
            email: non_empty(self.email),
            rate,
            comment: non_empty(self.comment),
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Collapse empty strings into absence. No trimming is performed.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// A validated survey answer, as persisted in the key-value store.
///
/// Only constructed through [`SurveyForm::into_record`]; never
/// modified after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyRecord {
    /// Subject being rated, non-empty
    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Rating in [1, 5]
    pub rate: u8,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Server-assigned, epoch milliseconds
    pub timestamp: i64,
}

/// Decoded reply from the Turnstile siteverify endpoint.
///
/// Transient; never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyOutcome {
    pub success: bool,

    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}
