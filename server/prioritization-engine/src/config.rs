//! Engine configuration: TOML file + env var overrides + sane defaults.
//!
//! A config value is immutable once built. Reconfiguration
//! (`EffortConfig::with_update`, `CriticalityConfig::with_module`/`with_weight`)
//! returns a new value; shared holders swap whole snapshots.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::normalize;
use crate::optimize::Objective;
use crate::types::{Constraints, Criticality};

/// Path of the TOML config file.
pub const ENV_CONFIG_PATH: &str = "PRIORITIZER_CONFIG";
/// Wall-clock budget for the exact optimizer, in milliseconds.
pub const ENV_EXACT_TIMEOUT_MS: &str = "PRIORITIZER_EXACT_TIMEOUT_MS";
/// `false`/`0` disables the exact optimizer (greedy only).
pub const ENV_EXACT_ENABLED: &str = "PRIORITIZER_EXACT_ENABLED";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub effort: EffortConfig,
  pub criticality: CriticalityConfig,
  pub optimizer: OptimizerConfig,
  /// Named strategy + constraint bundles a request may reference.
  pub policies: BTreeMap<String, PolicyConfig>,
}

/// Effort model coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortConfig {
  /// Lines of code a tester covers per hour.
  pub loc_per_hour: f64,
  /// Ceiling on the complexity multiplier.
  pub complexity_factor: f64,
  pub min_effort_hours: f64,
  pub max_effort_hours: f64,
}

impl Default for EffortConfig {
  fn default() -> Self {
    Self {
      loc_per_hour: 50.0,
      complexity_factor: 1.5,
      min_effort_hours: 0.5,
      max_effort_hours: 40.0,
    }
  }
}

/// Partial effort-model change; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortUpdate {
  pub loc_per_hour: Option<f64>,
  pub complexity_factor: Option<f64>,
  pub min_effort_hours: Option<f64>,
  pub max_effort_hours: Option<f64>,
}

impl EffortConfig {
  /// New config with the supplied coefficients replaced. The update is
  /// rejected as a whole if the result is invalid.
  pub fn with_update(&self, update: &EffortUpdate) -> Result<Self> {
    let next = Self {
      loc_per_hour: update.loc_per_hour.unwrap_or(self.loc_per_hour),
      complexity_factor: update.complexity_factor.unwrap_or(self.complexity_factor),
      min_effort_hours: update.min_effort_hours.unwrap_or(self.min_effort_hours),
      max_effort_hours: update.max_effort_hours.unwrap_or(self.max_effort_hours),
    };
    match next.invalid_field() {
      Some((field, reason)) => Err(EngineError::validation(field, reason)),
      None => Ok(next),
    }
  }

  fn invalid_field(&self) -> Option<(&'static str, &'static str)> {
    if !(self.loc_per_hour.is_finite() && self.loc_per_hour > 0.0) {
      return Some(("loc_per_hour", "must be > 0"));
    }
    if !(self.complexity_factor.is_finite() && self.complexity_factor >= 1.0) {
      return Some(("complexity_factor", "must be >= 1"));
    }
    if !(self.min_effort_hours.is_finite() && self.min_effort_hours > 0.0) {
      return Some(("min_effort_hours", "must be > 0"));
    }
    if !(self.max_effort_hours.is_finite() && self.max_effort_hours >= self.min_effort_hours) {
      return Some(("max_effort_hours", "must be >= min_effort_hours"));
    }
    None
  }
}

/// One keyword rule: a package segment containing `keyword` maps to `tier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleKeyword {
  pub keyword: String,
  pub tier: Criticality,
}

impl ModuleKeyword {
  fn new(keyword: &str, tier: Criticality) -> Self {
    Self {
      keyword: keyword.to_string(),
      tier,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
  pub high: f64,
  pub medium: f64,
  pub low: f64,
}

impl Default for TierWeights {
  fn default() -> Self {
    Self {
      high: 1.5,
      medium: 1.2,
      low: 1.0,
    }
  }
}

/// Keyword → tier rules (ordered: first match wins) and tier → weight map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityConfig {
  pub keywords: Vec<ModuleKeyword>,
  pub weights: TierWeights,
}

impl Default for CriticalityConfig {
  fn default() -> Self {
    use Criticality::*;
    let keywords = [
      ("auth", High),
      ("authentication", High),
      ("authorization", High),
      ("security", High),
      ("payment", High),
      ("billing", High),
      ("transaction", High),
      ("database", Medium),
      ("db", Medium),
      ("persistence", Medium),
      ("api", Medium),
      ("controller", Medium),
      ("service", Medium),
      ("utils", Low),
      ("util", Low),
      ("helper", Low),
      ("helpers", Low),
      ("common", Low),
      ("shared", Low),
    ]
    .into_iter()
    .map(|(k, t)| ModuleKeyword::new(k, t))
    .collect();

    Self {
      keywords,
      weights: TierWeights::default(),
    }
  }
}

/// Exact optimizer limits. Anything outside them degrades to greedy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
  pub exact_enabled: bool,
  pub time_budget_ms: u64,
  /// Inputs larger than this skip the exact optimizer.
  pub max_exact_items: usize,
  /// Field maximized by budget, coverage and multi-constraint selection.
  pub objective: Objective,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      exact_enabled: true,
      time_budget_ms: 2_000,
      max_exact_items: 2_000,
      objective: Objective::EffortAwareScore,
    }
  }
}

/// Read-only named policy. Explicit request fields win over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
  pub strategy: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub budget_hours: Option<f64>,
  #[serde(default)]
  pub target_coverage: Option<f64>,
  #[serde(default)]
  pub k: Option<usize>,
  #[serde(default)]
  pub max_classes: Option<usize>,
}

impl PolicyConfig {
  pub fn constraints(&self) -> Constraints {
    Constraints {
      budget_hours: self.budget_hours,
      target_coverage: self.target_coverage,
      max_items: self.max_classes,
      k: self.k,
    }
  }
}

impl EngineConfig {
  /// Parse and validate a TOML document. Missing sections take defaults.
  pub fn from_toml_str(raw: &str) -> Result<Self> {
    let mut config: Self = toml::from_str(raw)?;
    // Names are matched lower-cased.
    for rule in &mut config.criticality.keywords {
      rule.keyword = rule.keyword.trim().to_lowercase();
    }
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let raw = fs::read_to_string(path)
      .map_err(|e| EngineError::config(format!("cannot read {}: {}", path.display(), e)))?;
    Self::from_toml_str(&raw)
  }

  /// File named by `PRIORITIZER_CONFIG` (or defaults), then env overrides.
  pub fn load_from_env() -> Result<Self> {
    let base = match std::env::var(ENV_CONFIG_PATH) {
      Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
      _ => Self::default(),
    };
    base.with_overrides(|key| std::env::var(key).ok())
  }

  /// Apply overrides from a key lookup (the process environment in production).
  pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(raw) = lookup(ENV_EXACT_TIMEOUT_MS) {
      self.optimizer.time_budget_ms = raw.trim().parse().map_err(|_| {
        EngineError::config(format!("{}: expected milliseconds, got {:?}", ENV_EXACT_TIMEOUT_MS, raw))
      })?;
    }
    if let Some(raw) = lookup(ENV_EXACT_ENABLED) {
      self.optimizer.exact_enabled = match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
          return Err(EngineError::config(format!(
            "{}: expected a boolean, got {:?}",
            ENV_EXACT_ENABLED, raw
          )))
        }
      };
    }
    self.validate()?;
    Ok(self)
  }

  pub fn validate(&self) -> Result<()> {
    if let Some((field, reason)) = self.effort.invalid_field() {
      return Err(EngineError::config(format!("effort.{} {}", field, reason)));
    }

    let w = &self.criticality.weights;
    for (tier, weight) in [("high", w.high), ("medium", w.medium), ("low", w.low)] {
      if !(weight.is_finite() && weight > 0.0) {
        return Err(EngineError::config(format!("criticality.weights.{} must be > 0", tier)));
      }
    }
    if self.criticality.keywords.iter().any(|k| k.keyword.trim().is_empty()) {
      return Err(EngineError::config("criticality.keywords: keyword must not be empty"));
    }

    for (name, policy) in &self.policies {
      normalize::validate_constraints(&policy.constraints()).map_err(|err| match err {
        EngineError::Validation { field, reason } => {
          EngineError::config(format!("policies.{}.{}: {}", name, field, reason))
        }
        other => other,
      })?;
    }
    Ok(())
  }
}
