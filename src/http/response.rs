//! Response mapping for the HTTP surfaces.
//!
//! # Responsibilities
//! - Map relay errors to HTTP status codes
//! - Keep error bodies as small JSON objects

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::relay::RelayError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::EmptyMessage(_) | RelayError::MissingConversation => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
