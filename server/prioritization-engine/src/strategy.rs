//! Named prioritization strategies and plan assembly.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::optimize::Optimizer;
use crate::types::{Constraints, Criticality, EnrichedCandidate, OptimizerReport, PrioritizedItem};

pub const DEFAULT_K: usize = 20;
pub const DEFAULT_BUDGET_HOURS: f64 = 40.0;
pub const DEFAULT_TARGET_COVERAGE: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  TopKCoverage,
  #[default]
  MaximizePopt20,
  BudgetOptimization,
  CoverageOptimization,
  MultiObjective,
}

impl Strategy {
  pub const ALL: [Strategy; 5] = [
    Self::TopKCoverage,
    Self::MaximizePopt20,
    Self::BudgetOptimization,
    Self::CoverageOptimization,
    Self::MultiObjective,
  ];

  pub fn parse(name: &str) -> Option<Self> {
    match name.trim().to_ascii_lowercase().as_str() {
      "top_k_coverage" => Some(Self::TopKCoverage),
      "maximize_popt20" => Some(Self::MaximizePopt20),
      "budget_optimization" => Some(Self::BudgetOptimization),
      "coverage_optimization" => Some(Self::CoverageOptimization),
      "multi_objective" => Some(Self::MultiObjective),
      _ => None,
    }
  }

  /// Like `parse`, but unrecognized names fall back to `maximize_popt20`.
  pub fn from_name_loose(name: &str) -> Self {
    Self::parse(name).unwrap_or(Self::MaximizePopt20)
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::TopKCoverage => "top_k_coverage",
      Self::MaximizePopt20 => "maximize_popt20",
      Self::BudgetOptimization => "budget_optimization",
      Self::CoverageOptimization => "coverage_optimization",
      Self::MultiObjective => "multi_objective",
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Output of a strategy: items in final rank order, and how they were selected.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
  pub items: Vec<EnrichedCandidate>,
  pub report: OptimizerReport,
}

impl Ranked {
  fn direct(items: Vec<EnrichedCandidate>) -> Self {
    Self {
      items,
      report: OptimizerReport::direct(),
    }
  }
}

/// Stable sort, highest `effort_aware_score` first.
pub fn rank_by_score(items: &mut [EnrichedCandidate]) {
  items.sort_by(|a, b| {
    b.effort_aware_score
      .partial_cmp(&a.effort_aware_score)
      .unwrap_or(Ordering::Equal)
  });
}

fn ranked(mut items: Vec<EnrichedCandidate>) -> Vec<EnrichedCandidate> {
  rank_by_score(&mut items);
  items
}

pub fn top_k(items: &[EnrichedCandidate], k: usize) -> Ranked {
  let mut out = ranked(items.to_vec());
  out.truncate(k);
  Ranked::direct(out)
}

pub fn maximize_score(items: &[EnrichedCandidate]) -> Ranked {
  Ranked::direct(ranked(items.to_vec()))
}

pub fn budget_constrained(optimizer: &Optimizer, items: &[EnrichedCandidate], budget_hours: f64) -> Ranked {
  let selection = optimizer.select_under_budget(items, budget_hours);
  Ranked {
    items: ranked(selection.pick(items)),
    report: selection.report,
  }
}

/// Empty plan when `target_coverage` is outside (0, 1].
pub fn coverage_constrained(
  optimizer: &Optimizer,
  items: &[EnrichedCandidate],
  target_coverage: f64,
) -> Ranked {
  if !(target_coverage > 0.0 && target_coverage <= 1.0) {
    return Ranked::direct(Vec::new());
  }
  let selection = optimizer.select_for_coverage(items, target_coverage);
  Ranked {
    items: ranked(selection.pick(items)),
    report: selection.report,
  }
}

pub fn multi_objective(
  optimizer: &Optimizer,
  items: &[EnrichedCandidate],
  budget_hours: Option<f64>,
  target_coverage: Option<f64>,
  max_items: Option<usize>,
) -> Ranked {
  let selection = optimizer.select_multi_constraint(items, budget_hours, target_coverage, max_items);
  Ranked {
    items: ranked(selection.pick(items)),
    report: selection.report,
  }
}

/// Run `strategy`, reading only the constraints it understands.
pub fn apply(
  optimizer: &Optimizer,
  strategy: Strategy,
  items: &[EnrichedCandidate],
  constraints: &Constraints,
) -> Ranked {
  let out = match strategy {
    Strategy::TopKCoverage => top_k(items, constraints.k.unwrap_or(DEFAULT_K)),
    Strategy::MaximizePopt20 => maximize_score(items),
    Strategy::BudgetOptimization => budget_constrained(
      optimizer,
      items,
      constraints.budget_hours.unwrap_or(DEFAULT_BUDGET_HOURS),
    ),
    Strategy::CoverageOptimization => coverage_constrained(
      optimizer,
      items,
      constraints.target_coverage.unwrap_or(DEFAULT_TARGET_COVERAGE),
    ),
    Strategy::MultiObjective => multi_objective(
      optimizer,
      items,
      constraints.budget_hours,
      constraints.target_coverage,
      constraints.max_items,
    ),
  };
  debug!(
    strategy = strategy.name(),
    candidates = items.len(),
    selected = out.items.len(),
    method = ?out.report.method,
    "strategy applied"
  );
  out
}

/// Wrap ranked items into plan entries with dense 1-based priorities.
pub fn assemble(strategy: Strategy, ranked: Vec<EnrichedCandidate>) -> Vec<PrioritizedItem> {
  ranked
    .into_iter()
    .enumerate()
    .map(|(i, c)| {
      let module_criticality = c.module_criticality.unwrap_or_default();
      let reason = reason_for(module_criticality, c.risk_score, c.effort_aware_score);
      PrioritizedItem {
        class_name: c.class_name,
        priority: i + 1,
        risk_score: c.risk_score,
        effort_hours: c.effort_hours,
        effort_aware_score: c.effort_aware_score,
        module_criticality,
        loc: c.loc,
        cyclomatic_complexity: c.cyclomatic_complexity,
        num_methods: c.num_methods,
        num_dependencies: c.num_dependencies,
        strategy: strategy.name().to_string(),
        reason,
      }
    })
    .collect()
}

pub fn reason_for(tier: Criticality, risk: f64, score: f64) -> String {
  let mut parts: Vec<&str> = Vec::with_capacity(3);
  match tier {
    Criticality::High => parts.push("High criticality module"),
    Criticality::Medium => parts.push("Medium criticality module"),
    Criticality::Low => {}
  }
  if risk > 0.7 {
    parts.push("High risk");
  } else if risk > 0.5 {
    parts.push("Moderate risk");
  }
  if score > 0.3 {
    parts.push("Excellent effort-aware score");
  } else if score > 0.15 {
    parts.push("Good effort-aware score");
  }

  if parts.is_empty() {
    "Selected by strategy".to_string()
  } else {
    parts.join(", ")
  }
}
