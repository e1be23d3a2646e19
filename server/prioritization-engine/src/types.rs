//! Core types for the prioritization engine (JSON contracts + internal models).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the predictions provider sends)
// ---------------------------------------------------------------------------

/// One class to possibly test. Unknown fields are silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
  pub class_name: String,
  pub risk_score: f64,
  #[serde(default)]
  pub loc: i64,
  #[serde(default = "default_complexity")]
  pub cyclomatic_complexity: f64,
  #[serde(default)]
  pub num_methods: u32,
  #[serde(default)]
  pub num_dependencies: u32,
}

fn default_complexity() -> f64 {
  1.0
}

impl Candidate {
  pub fn new(class_name: impl Into<String>, risk_score: f64, loc: i64, complexity: f64) -> Self {
    Self {
      class_name: class_name.into(),
      risk_score,
      loc,
      cyclomatic_complexity: complexity,
      num_methods: 0,
      num_dependencies: 0,
    }
  }
}

/// Ground-truth defect label for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectLabel {
  pub class_name: String,
  #[serde(default)]
  pub has_defect: bool,
}

// ---------------------------------------------------------------------------
// Criticality tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
  #[default]
  Low,
  Medium,
  High,
}

impl Criticality {
  pub const ALL: [Criticality; 3] = [Self::High, Self::Medium, Self::Low];

  /// Strict parse: only the three tier names, case-insensitive.
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "high" => Some(Self::High),
      "medium" => Some(Self::Medium),
      "low" => Some(Self::Low),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::High => "high",
      Self::Medium => "medium",
      Self::Low => "low",
    }
  }
}

// ---------------------------------------------------------------------------
// Internal enriched model
// ---------------------------------------------------------------------------

/// A candidate plus engine-derived effort and criticality fields.
///
/// `module_criticality` stays `None` between effort estimation and
/// criticality classification; every plan item carries a tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCandidate {
  pub class_name: String,
  pub risk_score: f64,
  pub loc: i64,
  pub cyclomatic_complexity: f64,
  pub num_methods: u32,
  pub num_dependencies: u32,
  pub effort_hours: f64,
  pub effort_aware_score: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub module_criticality: Option<Criticality>,
}

/// Read access shared by enriched candidates and plan items, so the metrics
/// can score either.
pub trait PlanEntry {
  fn class_name(&self) -> &str;
  fn risk_score(&self) -> f64;
  fn effort_hours(&self) -> f64;
  fn effort_aware_score(&self) -> f64;
}

impl PlanEntry for EnrichedCandidate {
  fn class_name(&self) -> &str {
    &self.class_name
  }
  fn risk_score(&self) -> f64 {
    self.risk_score
  }
  fn effort_hours(&self) -> f64 {
    self.effort_hours
  }
  fn effort_aware_score(&self) -> f64 {
    self.effort_aware_score
  }
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// Constraint set; each strategy honors only the fields relevant to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
  #[serde(default)]
  pub budget_hours: Option<f64>,
  #[serde(default)]
  pub target_coverage: Option<f64>,
  #[serde(default)]
  pub max_items: Option<usize>,
  #[serde(default)]
  pub k: Option<usize>,
}

// ---------------------------------------------------------------------------
// Optimizer reporting
// ---------------------------------------------------------------------------

/// How a selection was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
  /// Exact branch-and-bound optimum.
  Exact,
  /// Greedy heuristic (after the exact optimizer declined or failed).
  Greedy,
  /// No optimization ran: plain ranking, empty input, or a trivial constraint.
  Direct,
}

/// Why the exact optimizer did not produce the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
  Disabled,
  TooManyItems,
  Timeout,
  Infeasible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerReport {
  pub method: SolveMethod,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fallback_reason: Option<FallbackReason>,
}

impl OptimizerReport {
  pub fn direct() -> Self {
    Self {
      method: SolveMethod::Direct,
      fallback_reason: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

/// One ranked entry of a plan. `priority` is 1-based and dense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedItem {
  pub class_name: String,
  pub priority: usize,
  pub risk_score: f64,
  pub effort_hours: f64,
  pub effort_aware_score: f64,
  pub module_criticality: Criticality,
  pub loc: i64,
  pub cyclomatic_complexity: f64,
  pub num_methods: u32,
  pub num_dependencies: u32,
  pub strategy: String,
  pub reason: String,
}

impl PlanEntry for PrioritizedItem {
  fn class_name(&self) -> &str {
    &self.class_name
  }
  fn risk_score(&self) -> f64 {
    self.risk_score
  }
  fn effort_hours(&self) -> f64 {
    self.effort_hours
  }
  fn effort_aware_score(&self) -> f64 {
    self.effort_aware_score
  }
}

/// Which signal the ranking metrics were computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricBasis {
  /// `risk_score` stands in for defects (no labels supplied).
  RiskProxy,
  /// Ground-truth defect labels.
  DefectLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
  pub total_effort_hours: f64,
  pub estimated_coverage_gain: f64,
  pub popt20_score: Option<f64>,
  pub recall_top20: Option<f64>,
  pub metric_basis: MetricBasis,
}

/// Per-plan summary used when comparing strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
  pub popt20: Option<f64>,
  pub recall_top20: Option<f64>,
  pub coverage_gain: f64,
  pub total_classes: usize,
  pub total_effort_hours: f64,
  pub total_risk_covered: f64,
  pub avg_effort_aware_score: f64,
}

/// Tier counts over the enriched candidates of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalityBreakdown {
  pub high: usize,
  pub medium: usize,
  pub low: usize,
  pub total: usize,
  pub high_percent: f64,
  pub medium_percent: f64,
  pub low_percent: f64,
}

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// One prioritization request. Inline `predictions` take precedence over the
/// provider lookup keyed by repository / branch / sprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrioritizeRequest {
  #[serde(default)]
  pub repository_id: Option<String>,
  #[serde(default)]
  pub branch: Option<String>,
  #[serde(default)]
  pub sprint_id: Option<String>,
  #[serde(default)]
  pub predictions: Option<Vec<Candidate>>,
  #[serde(default)]
  pub strategy: Option<String>,
  #[serde(default)]
  pub policy: Option<String>,
  #[serde(default)]
  pub budget_hours: Option<f64>,
  #[serde(default)]
  pub target_coverage: Option<f64>,
  #[serde(default)]
  pub k: Option<usize>,
  #[serde(default)]
  pub max_classes: Option<usize>,
  #[serde(default)]
  pub baseline_coverage: Option<f64>,
  #[serde(default)]
  pub actual_defects: Option<Vec<DefectLabel>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
  pub plan_id: String,
  pub strategy: String,
  pub prioritized_plan: Vec<PrioritizedItem>,
  pub metrics: PlanMetrics,
  pub optimizer: OptimizerReport,
  pub criticality_breakdown: CriticalityBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResponse {
  pub strategies: BTreeMap<String, StrategyComparison>,
}

/// Structured error output for rejected requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub kind: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      error: true,
      kind: kind.into(),
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&crate::error::EngineError> for ErrorOutput {
  fn from(err: &crate::error::EngineError) -> Self {
    match err {
      crate::error::EngineError::Validation { field, reason } => {
        ErrorOutput::new(err.kind(), reason.clone()).with_field(field.clone())
      }
      _ => ErrorOutput::new(err.kind(), err.to_string()),
    }
  }
}
