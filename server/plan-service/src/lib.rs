//! Test Plan Service
//!
//! HTTP service that turns risk predictions into ranked test plans via the
//! prioritization engine, and lets operators reconfigure module criticality and the effort model.
//! Bind to 127.0.0.1 by default (internal only).

mod handlers;
mod state;
mod types;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use handlers::{compare, get_config, health, prioritize, put_effort, put_module, put_weight};
pub use state::AppState;
pub use types::{ApiError, Envelope, ModuleUpdate, WeightUpdate};

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/prioritize", post(prioritize))
    .route("/prioritize/compare", post(compare))
    .route("/config", get(get_config))
    .route("/config/criticality/modules", put(put_module))
    .route("/config/criticality/weights", put(put_weight))
    .route("/config/effort", put(put_effort))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
