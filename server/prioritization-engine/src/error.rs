//! Structured error types for the prioritization engine.
//!
//! Optimizer failures have no variant: they resolve to the greedy
//! heuristic inside `optimize` and never reach the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  /// Bad request: reported before any optimization attempt.
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  /// Predictions provider unreachable or errored ("no data", not "empty plan").
  #[error("upstream: {0}")]
  Upstream(String),

  #[error("config: {0}")]
  Config(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn upstream(msg: impl Into<String>) -> Self {
    Self::Upstream(msg.into())
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  /// Short machine-readable category used in error payloads.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Validation { .. } => "validation",
      Self::Upstream(_) => "upstream",
      Self::Config(_) | Self::Toml(_) => "config",
      Self::Json(_) | Self::Io(_) => "internal",
    }
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation { .. })
  }
}

pub type Result<T> = std::result::Result<T, EngineError>;
