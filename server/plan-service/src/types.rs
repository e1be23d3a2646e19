//! Request/response types for the plan service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use prioritization_engine::types::ErrorOutput;
use prioritization_engine::EngineError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `PUT /config/criticality/modules`
#[derive(Debug, Deserialize)]
pub struct ModuleUpdate {
  pub module: String,
  pub criticality: String,
}

/// `PUT /config/criticality/weights`
#[derive(Debug, Deserialize)]
pub struct WeightUpdate {
  pub criticality: String,
  pub weight: f64,
}

/// Response wrapper: a per-response id and timestamp around the body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub request_id: Uuid,
  pub generated_at: DateTime<Utc>,
  #[serde(flatten)]
  pub body: T,
}

impl<T> Envelope<T> {
  pub fn new(body: T) -> Self {
    Self {
      request_id: Uuid::new_v4(),
      generated_at: Utc::now(),
      body,
    }
  }
}

/// Engine error rendered as an `ErrorOutput` body with a matching status.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self.0.kind() {
      "validation" => StatusCode::BAD_REQUEST,
      "upstream" => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<EngineError> for ApiError {
  fn from(err: EngineError) -> Self {
    Self(err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status(), Json(ErrorOutput::from(&self.0))).into_response()
  }
}
