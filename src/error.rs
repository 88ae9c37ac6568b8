//! Error types for the ticketing server

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::gateway;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error(transparent)]
  Gateway(#[from] gateway::Error),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::NotFound(message.into())
  }

  pub fn unauthorized(message: impl Into<String>) -> Self {
    Self::Unauthorized(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Error::Forbidden(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::Gateway(_) => StatusCode::BAD_GATEWAY,
      Error::Database(_) | Error::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    debug!("Rejected request body: {}", rejection.body_text());
    Error::validation("Corpo da requisição inválido")
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Error::Database(_) | Error::Internal(_) => {
        error!("Request failed: {self}");
        "Erro interno do servidor".to_string()
      }
      Error::Gateway(err) => {
        warn!("Gateway error surfaced to buyer: {err}");
        err.user_message()
      }
      other => other.to_string(),
    };

    (status, Json(json::json!({ "error": message }))).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_codes() {
    assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
    assert_eq!(Error::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
    assert_eq!(Error::not_found("x").status(), StatusCode::NOT_FOUND);
    assert_eq!(
      Error::Internal("boom".into()).status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
      Error::Gateway(gateway::Error::Provider("recusado".into())).status(),
      StatusCode::BAD_GATEWAY
    );
  }
}
