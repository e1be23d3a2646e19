//! Test-authoring effort estimation and effort-aware scoring.

use tracing::debug;

use crate::config::EffortConfig;
use crate::numeric::round_to;
use crate::types::{Candidate, EnrichedCandidate};

/// Hours per method to write a test for it.
const HOURS_PER_METHOD: f64 = 0.1;
/// Hours per dependency to mock it.
const HOURS_PER_DEPENDENCY: f64 = 0.05;
/// Complexity at or below which no multiplier applies.
const COMPLEXITY_THRESHOLD: f64 = 10.0;
/// Effort floor used as the score denominator.
pub const EFFORT_FLOOR_HOURS: f64 = 0.1;

/// Estimated hours to write tests for one class, in `[min, max]`, 2 decimals.
pub fn estimate_hours(
  config: &EffortConfig,
  loc: i64,
  complexity: f64,
  num_methods: u32,
  num_dependencies: u32,
) -> f64 {
  if loc <= 0 {
    return config.min_effort_hours;
  }

  let base = loc as f64 / config.loc_per_hour;
  let multiplier = if complexity <= COMPLEXITY_THRESHOLD {
    1.0
  } else {
    (1.0 + (complexity - COMPLEXITY_THRESHOLD) / 20.0).min(config.complexity_factor)
  };

  let hours = base * multiplier
    + HOURS_PER_METHOD * num_methods as f64
    + HOURS_PER_DEPENDENCY * num_dependencies as f64;

  round_to(
    hours.clamp(config.min_effort_hours, config.max_effort_hours),
    2,
  )
}

/// `risk / max(hours, 0.1)`, 4 decimals; non-positive hours score 0.
pub fn effort_aware_score(risk: f64, hours: f64) -> f64 {
  if hours <= 0.0 {
    return 0.0;
  }
  round_to(risk / hours.max(EFFORT_FLOOR_HOURS), 4)
}

/// Attach effort and effort-aware score to every candidate, in input order.
pub fn enrich(config: &EffortConfig, candidates: &[Candidate]) -> Vec<EnrichedCandidate> {
  let enriched: Vec<EnrichedCandidate> = candidates
    .iter()
    .map(|c| {
      let effort_hours = estimate_hours(
        config,
        c.loc,
        c.cyclomatic_complexity,
        c.num_methods,
        c.num_dependencies,
      );
      EnrichedCandidate {
        class_name: c.class_name.clone(),
        risk_score: c.risk_score,
        loc: c.loc,
        cyclomatic_complexity: c.cyclomatic_complexity,
        num_methods: c.num_methods,
        num_dependencies: c.num_dependencies,
        effort_hours,
        effort_aware_score: effort_aware_score(c.risk_score, effort_hours),
        module_criticality: None,
      }
    })
    .collect();

  debug!(
    count = enriched.len(),
    total_effort_hours = enriched.iter().map(|c| c.effort_hours).sum::<f64>(),
    "effort estimated"
  );
  enriched
}
