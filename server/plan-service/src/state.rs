//! Shared service state: the current config snapshot and the predictions
//! provider.

use std::sync::Arc;

use parking_lot::RwLock;
use prioritization_engine::error::Result;
use prioritization_engine::{Engine, EngineConfig, PredictionsProvider};

pub struct AppState {
  config: RwLock<Arc<EngineConfig>>,
  provider: Option<Arc<dyn PredictionsProvider>>,
}

impl AppState {
  pub fn new(config: EngineConfig, provider: Option<Arc<dyn PredictionsProvider>>) -> Self {
    Self {
      config: RwLock::new(Arc::new(config)),
      provider,
    }
  }

  /// The config in effect right now. Later reconfiguration does not affect it.
  pub fn snapshot(&self) -> Arc<EngineConfig> {
    self.config.read().clone()
  }

  /// An engine bound to the current snapshot.
  pub fn engine(&self) -> Engine {
    let engine = Engine::from_shared(self.snapshot());
    match &self.provider {
      Some(p) => engine.with_provider(p.clone()),
      None => engine,
    }
  }

  /// Derive a new config from the current one and publish it. Writers are
  /// serialized; on error the current snapshot stays in place.
  pub fn reconfigure<F>(&self, derive: F) -> Result<Arc<EngineConfig>>
  where
    F: FnOnce(&EngineConfig) -> Result<EngineConfig>,
  {
    let mut current = self.config.write();
    let next = Arc::new(derive(&current)?);
    *current = next.clone();
    Ok(next)
  }
}
