//! HTTP handlers for the plan service.

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use prioritization_engine::config::{CriticalityConfig, EffortConfig, EffortUpdate};
use prioritization_engine::types::{ComparisonResponse, PlanResponse};
use prioritization_engine::{EngineConfig, EngineError, PrioritizeRequest};

use crate::state::AppState;
use crate::types::{ApiError, Envelope, ModuleUpdate, WeightUpdate};

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub async fn health() -> &'static str {
  "ok"
}

pub async fn prioritize(
  State(state): State<Arc<AppState>>,
  Json(req): Json<PrioritizeRequest>,
) -> ApiResult<PlanResponse> {
  let engine = state.engine();
  let plan = tokio::task::spawn_blocking(move || engine.prioritize(&req))
    .await
    .map_err(|e| EngineError::Io(std::io::Error::other(e)))??;
  Ok(Json(Envelope::new(plan)))
}

pub async fn compare(
  State(state): State<Arc<AppState>>,
  Json(req): Json<PrioritizeRequest>,
) -> ApiResult<ComparisonResponse> {
  let engine = state.engine();
  let comparison = tokio::task::spawn_blocking(move || engine.compare_strategies(&req))
    .await
    .map_err(|e| EngineError::Io(std::io::Error::other(e)))??;
  Ok(Json(Envelope::new(comparison)))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Envelope<EngineConfig>> {
  Json(Envelope::new(state.snapshot().as_ref().clone()))
}

pub async fn put_module(
  State(state): State<Arc<AppState>>,
  Json(update): Json<ModuleUpdate>,
) -> ApiResult<CriticalityConfig> {
  let next = state.reconfigure(|current| {
    Ok(EngineConfig {
      criticality: current.criticality.with_module(&update.module, &update.criticality)?,
      ..current.clone()
    })
  })?;
  info!(module = %update.module, tier = %update.criticality, "criticality module updated");
  Ok(Json(Envelope::new(next.criticality.clone())))
}

pub async fn put_weight(
  State(state): State<Arc<AppState>>,
  Json(update): Json<WeightUpdate>,
) -> ApiResult<CriticalityConfig> {
  let next = state.reconfigure(|current| {
    Ok(EngineConfig {
      criticality: current.criticality.with_weight(&update.criticality, update.weight)?,
      ..current.clone()
    })
  })?;
  info!(tier = %update.criticality, weight = update.weight, "criticality weight updated");
  Ok(Json(Envelope::new(next.criticality.clone())))
}

pub async fn put_effort(
  State(state): State<Arc<AppState>>,
  Json(update): Json<EffortUpdate>,
) -> ApiResult<EffortConfig> {
  let next = state.reconfigure(|current| {
    Ok(EngineConfig {
      effort: current.effort.with_update(&update)?,
      ..current.clone()
    })
  })?;
  info!(
    loc_per_hour = next.effort.loc_per_hour,
    complexity_factor = next.effort.complexity_factor,
    min_effort_hours = next.effort.min_effort_hours,
    max_effort_hours = next.effort.max_effort_hours,
    "effort model updated"
  );
  Ok(Json(Envelope::new(next.effort.clone())))
}
