//! Uniform JSON responses carrying the fixed cross-origin headers.
//!
//! Every endpoint response is built here; there is no other path, so
//! no exit point can miss the CORS headers.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use survey_common::constants::cors;

/// Build a JSON response with the fixed cross-origin headers.
pub fn json(status: StatusCode, body: impl Serialize) -> Response {
    with_cors((status, Json(body)).into_response())
}

/// 204 preflight response: no body, cross-origin headers only.
pub fn no_content() -> Response {
    with_cors(StatusCode::NO_CONTENT.into_response())
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(cors::ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(cors::ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(cors::ALLOW_HEADERS),
    );
    response
}
