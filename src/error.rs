//! Error taxonomy of the backend and its HTTP representation.
//!
//! Every handler returns [`ApiError`] on failure. The error is rendered as
//!
//! ```text
//! {"error": {"status": 404, "message": "track 4uLU6h... is not part of the fitted set"}}
//! ```
//!
//! Upstream failures carry the status code Spotify answered with and a short,
//! sanitized description. Raw upstream bodies are logged by the Spotify client
//! and never forwarded.

use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::recommend::RecommendError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("Spotify API error ({status}): {detail}")]
    ExternalApi { status: u16, detail: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("no recommendation model has been trained for this session")]
    NotFitted,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ExternalApi { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotFitted => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": self.to_string(),
            }
        }));

        let mut response = (status, body).into_response();
        if let ApiError::Unauthorized(_) = self {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            RecommendError::NotFound(id) => {
                ApiError::NotFound(format!("track {} is not part of the fitted set", id))
            }
            RecommendError::NotFitted => ApiError::NotFitted,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 => {
                ApiError::Unauthorized("Spotify rejected the access token".to_string())
            }
            Some(status) => ApiError::ExternalApi {
                status: status.as_u16(),
                detail: status
                    .canonical_reason()
                    .unwrap_or("upstream request failed")
                    .to_string(),
            },
            None if err.is_decode() => ApiError::ExternalApi {
                status: 502,
                detail: "unexpected response from Spotify".to_string(),
            },
            None => ApiError::ExternalApi {
                status: 502,
                detail: "Spotify could not be reached".to_string(),
            },
        }
    }
}
