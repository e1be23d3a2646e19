//! Module criticality: keyword tiers derived from a class's qualified name,
//! and tier weights applied to effort-aware scores.

use tracing::debug;

use crate::config::{CriticalityConfig, ModuleKeyword};
use crate::error::{EngineError, Result};
use crate::numeric::round_to;
use crate::types::{Criticality, CriticalityBreakdown, EnrichedCandidate};

/// Tier for a qualified class name (e.g. `com.example.auth.UserService`).
///
/// Each package segment, in order, is tested against every keyword by
/// substring; the first hit wins. No hit (or an empty name) is `Low`.
pub fn classify(config: &CriticalityConfig, qualified_name: &str) -> Criticality {
  if qualified_name.is_empty() {
    return Criticality::Low;
  }
  let lower = qualified_name.to_lowercase();
  lower
    .split('.')
    .find_map(|segment| {
      config
        .keywords
        .iter()
        .find(|rule| segment.contains(rule.keyword.as_str()))
        .map(|rule| rule.tier)
    })
    .unwrap_or(Criticality::Low)
}

/// `round(score * weight[tier], 4)`.
pub fn apply_weight(config: &CriticalityConfig, score: f64, tier: Criticality) -> f64 {
  round_to(score * config.weight_for(tier), 4)
}

/// Classify every item and overwrite its score with the weighted value.
pub fn enrich(config: &CriticalityConfig, items: Vec<EnrichedCandidate>) -> Vec<EnrichedCandidate> {
  let out: Vec<EnrichedCandidate> = items
    .into_iter()
    .map(|mut item| {
      let tier = classify(config, &item.class_name);
      item.effort_aware_score = apply_weight(config, item.effort_aware_score, tier);
      item.module_criticality = Some(tier);
      item
    })
    .collect();

  debug!(count = out.len(), "criticality applied");
  out
}

/// Tier counts and percentages (2 decimals).
pub fn breakdown(items: &[EnrichedCandidate]) -> CriticalityBreakdown {
  let mut b = CriticalityBreakdown {
    total: items.len(),
    ..Default::default()
  };
  for item in items {
    match item.module_criticality.unwrap_or_default() {
      Criticality::High => b.high += 1,
      Criticality::Medium => b.medium += 1,
      Criticality::Low => b.low += 1,
    }
  }
  if b.total > 0 {
    let pct = |n: usize| round_to(n as f64 / b.total as f64 * 100.0, 2);
    b.high_percent = pct(b.high);
    b.medium_percent = pct(b.medium);
    b.low_percent = pct(b.low);
  }
  b
}

impl CriticalityConfig {
  pub fn weight_for(&self, tier: Criticality) -> f64 {
    match tier {
      Criticality::High => self.weights.high,
      Criticality::Medium => self.weights.medium,
      Criticality::Low => self.weights.low,
    }
  }

  /// New config with `module` mapped to `tier`. An existing keyword keeps its
  /// position; a new one is appended (lowest precedence).
  pub fn with_module(&self, module: &str, tier: &str) -> Result<Self> {
    let tier = Criticality::from_str_loose(tier)
      .ok_or_else(|| EngineError::validation("criticality", "expected high|medium|low"))?;
    let keyword = module.trim().to_lowercase();
    if keyword.is_empty() {
      return Err(EngineError::validation("module", "must not be empty"));
    }

    let mut next = self.clone();
    match next.keywords.iter_mut().find(|rule| rule.keyword == keyword) {
      Some(rule) => rule.tier = tier,
      None => next.keywords.push(ModuleKeyword { keyword, tier }),
    }
    Ok(next)
  }

  /// New config with the weight of `tier` replaced. Weight must be > 0.
  pub fn with_weight(&self, tier: &str, weight: f64) -> Result<Self> {
    let tier = Criticality::from_str_loose(tier)
      .ok_or_else(|| EngineError::validation("criticality", "expected high|medium|low"))?;
    if !(weight.is_finite() && weight > 0.0) {
      return Err(EngineError::validation("weight", "must be > 0"));
    }

    let mut next = self.clone();
    match tier {
      Criticality::High => next.weights.high = weight,
      Criticality::Medium => next.weights.medium = weight,
      Criticality::Low => next.weights.low = weight,
    }
    Ok(next)
  }
}
