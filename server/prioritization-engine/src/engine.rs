//! Request orchestration: policy resolution, validation, enrichment,
//! strategy selection, plan assembly and metrics.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{EngineConfig, PolicyConfig};
use crate::criticality;
use crate::effort;
use crate::error::{EngineError, Result};
use crate::fingerprint;
use crate::metrics;
use crate::normalize;
use crate::optimize::Optimizer;
use crate::provider::{PlanKey, PredictionsProvider};
use crate::strategy::{self, Strategy};
use crate::types::*;

/// The prioritization engine. Stateless between requests; holds only a
/// config snapshot and an optional predictions provider.
#[derive(Clone)]
pub struct Engine {
  config: Arc<EngineConfig>,
  optimizer: Optimizer,
  provider: Option<Arc<dyn PredictionsProvider>>,
}

/// Strategy and constraints after merging the request over its policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
  pub strategy: Strategy,
  pub constraints: Constraints,
}

impl Engine {
  pub fn new(config: EngineConfig) -> Self {
    Self::from_shared(Arc::new(config))
  }

  pub fn with_defaults() -> Self {
    Self::new(EngineConfig::default())
  }

  /// Build over a shared snapshot (what the HTTP service holds).
  pub fn from_shared(config: Arc<EngineConfig>) -> Self {
    Self {
      optimizer: Optimizer::from_config(&config.optimizer),
      config,
      provider: None,
    }
  }

  pub fn with_provider(mut self, provider: Arc<dyn PredictionsProvider>) -> Self {
    self.provider = Some(provider);
    self
  }

  /// Produce one ranked, constraint-respecting plan with its metrics.
  pub fn prioritize(&self, req: &PrioritizeRequest) -> Result<PlanResponse> {
    let resolved = self.resolve(req)?;
    let candidates = self.enriched_candidates(req)?;
    let criticality_breakdown = criticality::breakdown(&candidates);

    let ranked = strategy::apply(&self.optimizer, resolved.strategy, &candidates, &resolved.constraints);
    let optimizer = ranked.report;
    let prioritized_plan = strategy::assemble(resolved.strategy, ranked.items);
    let metrics = metrics::evaluate(
      &prioritized_plan,
      req.actual_defects.as_deref(),
      req.baseline_coverage,
    );
    let plan_id = fingerprint::plan_id(resolved.strategy.name(), &prioritized_plan);

    info!(
      plan_id = %plan_id,
      strategy = resolved.strategy.name(),
      candidates = candidates.len(),
      selected = prioritized_plan.len(),
      method = ?optimizer.method,
      fallback = ?optimizer.fallback_reason,
      total_effort_hours = metrics.total_effort_hours,
      "plan generated"
    );

    Ok(PlanResponse {
      plan_id,
      strategy: resolved.strategy.name().to_string(),
      prioritized_plan,
      metrics,
      optimizer,
      criticality_breakdown,
    })
  }

  /// Run every strategy over the same candidates and summarize each plan.
  /// The request's own strategy (and its policy's) is ignored.
  pub fn compare_strategies(&self, req: &PrioritizeRequest) -> Result<ComparisonResponse> {
    let resolved = self.resolve(req)?;
    let candidates = self.enriched_candidates(req)?;

    let plans: BTreeMap<String, Vec<PrioritizedItem>> = Strategy::ALL
      .iter()
      .map(|&s| {
        let ranked = strategy::apply(&self.optimizer, s, &candidates, &resolved.constraints);
        (s.name().to_string(), strategy::assemble(s, ranked.items))
      })
      .collect();

    let strategies = metrics::compare(&plans, req.actual_defects.as_deref());
    info!(candidates = candidates.len(), strategies = strategies.len(), "strategies compared");
    Ok(ComparisonResponse { strategies })
  }

  /// Merge request fields over the named policy (request wins) and validate.
  pub fn resolve(&self, req: &PrioritizeRequest) -> Result<Resolved> {
    let policy = match req.policy.as_deref() {
      Some(name) => Some(self.policy(name)?),
      None => None,
    };

    let strategy_name = req
      .strategy
      .as_deref()
      .or_else(|| policy.map(|p| p.strategy.as_str()));
    let strategy = match strategy_name {
      Some(name) => Strategy::parse(name).unwrap_or_else(|| {
        debug!(requested = name, "unrecognized strategy, using default");
        Strategy::default()
      }),
      None => Strategy::default(),
    };

    let base = policy.map(PolicyConfig::constraints).unwrap_or_default();
    let constraints = Constraints {
      budget_hours: req.budget_hours.or(base.budget_hours),
      target_coverage: req.target_coverage.or(base.target_coverage),
      max_items: req.max_classes.or(base.max_items),
      k: req.k.or(base.k),
    };
    normalize::validate_constraints(&constraints)?;
    normalize::validate_baseline(req.baseline_coverage)?;

    Ok(Resolved {
      strategy,
      constraints,
    })
  }

  fn policy(&self, name: &str) -> Result<&PolicyConfig> {
    self
      .config
      .policies
      .get(name.trim())
      .ok_or_else(|| EngineError::validation("policy", &format!("unknown policy {}", name)))
  }

  /// Inline predictions, or the provider's list for the request's key;
  /// validated, with effort and criticality applied.
  pub fn enriched_candidates(&self, req: &PrioritizeRequest) -> Result<Vec<EnrichedCandidate>> {
    let raw = match &req.predictions {
      Some(inline) => normalize::normalize_candidates(inline)?,
      None => normalize::normalize_candidates(&self.fetch(req)?)?,
    };
    let enriched = effort::enrich(&self.config.effort, &raw);
    Ok(criticality::enrich(&self.config.criticality, enriched))
  }

  fn fetch(&self, req: &PrioritizeRequest) -> Result<Vec<Candidate>> {
    let repository_id = req
      .repository_id
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| {
        EngineError::validation("repository_id", "required when predictions are not inline")
      })?;
    let provider = self
      .provider
      .as_ref()
      .ok_or_else(|| EngineError::upstream("no predictions provider configured"))?;

    let key = PlanKey {
      repository_id: repository_id.to_string(),
      branch: non_empty(req.branch.as_deref()),
      sprint_id: non_empty(req.sprint_id.as_deref()),
    };
    provider.fetch(&key)
  }
}

fn non_empty(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
