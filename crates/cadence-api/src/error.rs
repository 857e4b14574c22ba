//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Registry(#[from] cadence_core::Error),

  #[error("journal error: {0}")]
  Journal(#[from] cadence_journal_sqlite::Error),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(String),
}

fn registry_status(error: &cadence_core::Error) -> StatusCode {
  use cadence_core::Error;
  match error {
    Error::NotFound(_) | Error::IdNotFound { .. } => StatusCode::NOT_FOUND,
    Error::Unauthorized { .. } => StatusCode::FORBIDDEN,
    Error::DuplicateRegistration { .. }
    | Error::AlreadyCancelled(_)
    | Error::NotYetDue { .. } => StatusCode::CONFLICT,
    Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
    Error::Ledger(_) => StatusCode::PAYMENT_REQUIRED,
    Error::Hook(_) => StatusCode::BAD_GATEWAY,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Registry(e) => registry_status(e),
      ApiError::Journal(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
