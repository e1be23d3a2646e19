//! Binary entrypoint for the test plan service.

use std::net::SocketAddr;
use std::sync::Arc;

use prioritization_engine::{EngineConfig, HttpProvider, JsonDirProvider, PredictionsProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;

use plan_service::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "8006".into()).parse()?;
  let config = EngineConfig::load_from_env()?;
  // PREDICTIONS_DIR wins; otherwise the ML service (ML_SERVICE_URL, default :8005).
  let provider: Arc<dyn PredictionsProvider> = match std::env::var("PREDICTIONS_DIR") {
    Ok(dir) if !dir.trim().is_empty() => Arc::new(JsonDirProvider::new(dir.trim())),
    _ => {
      // The blocking client must not be built on an async worker.
      let http = tokio::task::spawn_blocking(HttpProvider::from_env).await??;
      info!(endpoint = %http.endpoint(), "predictions from ML service");
      Arc::new(http)
    }
  };

  info!(
    exact_enabled = config.optimizer.exact_enabled,
    time_budget_ms = config.optimizer.time_budget_ms,
    policies = config.policies.len(),
    "config loaded"
  );

  let state = Arc::new(AppState::new(config, Some(provider)));
  let app = plan_service::router(state);

  let addr = SocketAddr::from(([127, 0, 0, 1], port));
  info!(%addr, "plan-service listening");

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
