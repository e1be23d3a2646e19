//! Test prioritization engine: deterministic, effort-aware test planning.
//!
//! Takes per-class risk predictions, estimates test-authoring effort,
//! weights by module criticality, selects a subset under budget / coverage /
//! count constraints, and scores the resulting plan.
//!
//! No network, no DB; pure computation over immutable config snapshots.

pub mod config;
pub mod criticality;
pub mod effort;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod normalize;
pub mod numeric;
pub mod optimize;
pub mod provider;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use provider::{HttpProvider, JsonDirProvider, PlanKey, PredictionsProvider, StaticProvider};
pub use strategy::Strategy;
pub use types::{PlanResponse, PrioritizeRequest};
