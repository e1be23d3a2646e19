//! Constrained subset selection over enriched candidates.
//!
//! Every operation tries the exact optimizer first and, on any non-success
//! outcome, runs the matching greedy heuristic. The returned `Selection`
//! records which path produced it. Selections are unordered index sets
//! (ascending); callers rank them.

pub mod exact;
pub mod greedy;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OptimizerConfig;
use crate::types::{EnrichedCandidate, FallbackReason, OptimizerReport, SolveMethod};
use exact::ExactOptimizer;

/// Slack on coverage comparisons so float sums that land on the target count.
pub(crate) const RISK_EPSILON: f64 = 1e-9;

/// Column view of the candidates handed to a solver.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
  pub objective: &'a [f64],
  pub effort: &'a [f64],
  pub risk: &'a [f64],
}

impl Problem<'_> {
  pub fn len(&self) -> usize {
    self.objective.len()
  }

  pub fn is_empty(&self) -> bool {
    self.objective.is_empty()
  }
}

/// Active constraints. `None` means not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limits {
  /// Upper bound on summed effort hours.
  pub budget: Option<f64>,
  /// Lower bound on summed risk (absolute, not a fraction).
  pub min_risk: Option<f64>,
  pub max_items: Option<usize>,
}

/// Candidate field being maximized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
  #[default]
  EffortAwareScore,
  RiskScore,
}

impl Objective {
  pub fn value(self, item: &EnrichedCandidate) -> f64 {
    match self {
      Self::EffortAwareScore => item.effort_aware_score,
      Self::RiskScore => item.risk_score,
    }
  }
}

struct Columns {
  objective: Vec<f64>,
  effort: Vec<f64>,
  risk: Vec<f64>,
}

impl Columns {
  fn project(items: &[EnrichedCandidate], objective: Objective) -> Self {
    Self {
      objective: items.iter().map(|c| objective.value(c)).collect(),
      effort: items.iter().map(|c| c.effort_hours).collect(),
      risk: items.iter().map(|c| c.risk_score).collect(),
    }
  }

  fn problem(&self) -> Problem<'_> {
    Problem {
      objective: &self.objective,
      effort: &self.effort,
      risk: &self.risk,
    }
  }

  fn total_risk(&self) -> f64 {
    self.risk.iter().sum()
  }
}

/// Chosen indices into the input slice, plus how they were chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
  pub indices: Vec<usize>,
  pub report: OptimizerReport,
}

impl Selection {
  fn direct(indices: Vec<usize>) -> Self {
    Self {
      indices,
      report: OptimizerReport::direct(),
    }
  }

  /// The selected items, cloned, in input order.
  pub fn pick<T: Clone>(&self, items: &[T]) -> Vec<T> {
    self.indices.iter().filter_map(|&i| items.get(i).cloned()).collect()
  }
}

#[derive(Debug, Clone)]
pub struct Optimizer {
  exact: ExactOptimizer,
  objective: Objective,
}

impl Optimizer {
  pub fn new(exact: ExactOptimizer) -> Self {
    Self {
      exact,
      objective: Objective::default(),
    }
  }

  pub fn from_config(config: &OptimizerConfig) -> Self {
    Self::new(ExactOptimizer::from_config(config)).with_objective(config.objective)
  }

  /// Greedy only; every selection reports `fallback_reason = disabled`.
  pub fn greedy_only() -> Self {
    Self::new(ExactOptimizer::disabled())
  }

  pub fn with_objective(mut self, objective: Objective) -> Self {
    self.objective = objective;
    self
  }

  /// Max Σobjective subject to Σeffort ≤ `budget_hours`.
  pub fn select_under_budget(&self, items: &[EnrichedCandidate], budget_hours: f64) -> Selection {
    if items.is_empty() || !(budget_hours > 0.0) {
      return Selection::direct(Vec::new());
    }
    let cols = Columns::project(items, self.objective);
    let problem = cols.problem();
    let limits = Limits {
      budget: Some(budget_hours),
      ..Limits::default()
    };
    self.decide("budget", &problem, &limits, || {
      greedy::under_budget(&problem, budget_hours)
    })
  }

  /// Max Σobjective subject to Σrisk ≥ `target_coverage` × total risk.
  /// A target of 1.0 (or more) selects everything without solving.
  pub fn select_for_coverage(&self, items: &[EnrichedCandidate], target_coverage: f64) -> Selection {
    if items.is_empty() || !(target_coverage > 0.0) {
      return Selection::direct(Vec::new());
    }
    if target_coverage >= 1.0 {
      return Selection::direct((0..items.len()).collect());
    }
    let cols = Columns::project(items, self.objective);
    let problem = cols.problem();
    let target_risk = cols.total_risk() * target_coverage;
    let limits = Limits {
      min_risk: Some(target_risk),
      ..Limits::default()
    };
    self.decide("coverage", &problem, &limits, || {
      greedy::for_coverage(&problem, target_risk)
    })
  }

  /// Max Σobjective subject to every supplied constraint at once.
  pub fn select_multi_constraint(
    &self,
    items: &[EnrichedCandidate],
    budget_hours: Option<f64>,
    target_coverage: Option<f64>,
    max_items: Option<usize>,
  ) -> Selection {
    if items.is_empty() {
      return Selection::direct(Vec::new());
    }
    let cols = Columns::project(items, self.objective);
    let problem = cols.problem();
    let target_risk = target_coverage.map(|t| cols.total_risk() * t.min(1.0));
    let limits = Limits {
      budget: budget_hours,
      min_risk: target_risk,
      max_items,
    };
    self.decide("multi_constraint", &problem, &limits, || {
      greedy::multi_constraint(&problem, budget_hours, target_risk, max_items)
    })
  }

  fn decide<G>(&self, operation: &str, problem: &Problem<'_>, limits: &Limits, greedy: G) -> Selection
  where
    G: FnOnce() -> Vec<usize>,
  {
    match self.exact.solve(problem, limits) {
      Ok(indices) => {
        debug!(operation, selected = indices.len(), "exact optimum found");
        Selection {
          indices,
          report: OptimizerReport {
            method: SolveMethod::Exact,
            fallback_reason: None,
          },
        }
      }
      Err(reason) => {
        if reason == FallbackReason::Disabled {
          debug!(operation, "exact optimizer disabled, using greedy");
        } else {
          warn!(operation, ?reason, items = problem.len(), "exact optimizer fell back to greedy");
        }
        Selection {
          indices: greedy(),
          report: OptimizerReport {
            method: SolveMethod::Greedy,
            fallback_reason: Some(reason),
          },
        }
      }
    }
  }
}

impl Default for Optimizer {
  fn default() -> Self {
    Self::from_config(&OptimizerConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(name: &str, risk: f64, effort: f64, score: f64) -> EnrichedCandidate {
    EnrichedCandidate {
      class_name: name.into(),
      risk_score: risk,
      loc: 100,
      cyclomatic_complexity: 1.0,
      num_methods: 0,
      num_dependencies: 0,
      effort_hours: effort,
      effort_aware_score: score,
      module_criticality: None,
    }
  }

  fn four() -> Vec<EnrichedCandidate> {
    vec![
      item("a.UserService", 0.75, 4.0, 0.1875),
      item("a.PaymentService", 0.68, 5.0, 0.136),
      item("a.StringHelper", 0.45, 1.0, 0.45),
      item("a.UserRepository", 0.60, 2.0, 0.30),
    ]
  }

  fn effort_of(items: &[EnrichedCandidate], sel: &Selection) -> f64 {
    sel.indices.iter().map(|&i| items[i].effort_hours).sum()
  }

  #[test]
  fn greedy_budget_selection_is_flagged() {
    let items = four();
    let sel = Optimizer::greedy_only().select_under_budget(&items, 5.0);
    assert_eq!(sel.indices, vec![2, 3]);
    assert_eq!(effort_of(&items, &sel), 3.0);
    assert_eq!(sel.report.method, SolveMethod::Greedy);
    assert_eq!(sel.report.fallback_reason, Some(FallbackReason::Disabled));
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn exact_budget_selection() {
    let items = four();
    let sel = Optimizer::default().select_under_budget(&items, 5.0);
    assert_eq!(sel.indices, vec![2, 3]);
    assert_eq!(sel.report.method, SolveMethod::Exact);
    assert_eq!(sel.report.fallback_reason, None);
  }

  #[test]
  fn trivial_inputs_skip_solving() {
    let opt = Optimizer::default();
    let items = four();
    assert_eq!(opt.select_under_budget(&[], 10.0), Selection::direct(vec![]));
    assert_eq!(opt.select_under_budget(&items, 0.0).indices, Vec::<usize>::new());
    assert_eq!(opt.select_for_coverage(&[], 0.5).report.method, SolveMethod::Direct);
    assert_eq!(opt.select_multi_constraint(&[], Some(1.0), None, None).indices, Vec::<usize>::new());

    let all = opt.select_for_coverage(&items, 1.0);
    assert_eq!(all.indices, vec![0, 1, 2, 3]);
    assert_eq!(all.report, OptimizerReport::direct());
  }

  #[test]
  fn greedy_coverage_meets_target() {
    let items = four();
    let sel = Optimizer::greedy_only().select_for_coverage(&items, 0.4);
    let covered: f64 = sel.indices.iter().map(|&i| items[i].risk_score).sum();
    assert!(covered >= 0.4 * 2.48 - RISK_EPSILON);
    assert_eq!(sel.indices, vec![2, 3]);
  }

  #[test]
  fn multi_constraint_holds_every_limit() {
    let items = four();
    for opt in [Optimizer::default(), Optimizer::greedy_only()] {
      let sel = opt.select_multi_constraint(&items, Some(6.0), Some(0.4), Some(2));
      assert!(sel.indices.len() <= 2);
      assert!(effort_of(&items, &sel) <= 6.0);
      let covered: f64 = sel.indices.iter().map(|&i| items[i].risk_score).sum();
      assert!(covered >= 0.4 * 2.48 - RISK_EPSILON, "{:?}", sel);
    }
  }

  #[test]
  fn risk_objective_changes_the_pick() {
    let items = four();
    let by_score = Optimizer::greedy_only().select_multi_constraint(&items, None, None, Some(1));
    assert_eq!(by_score.indices, vec![2]);

    let config = OptimizerConfig {
      objective: Objective::RiskScore,
      ..OptimizerConfig::default()
    };
    for opt in [Optimizer::from_config(&config), Optimizer::greedy_only().with_objective(Objective::RiskScore)] {
      let sel = opt.select_multi_constraint(&items, None, None, Some(1));
      assert_eq!(sel.indices, vec![0]);
    }
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn timeout_returns_greedy_selection_with_reason() {
    let items: Vec<EnrichedCandidate> = (0..600)
      .map(|i| {
        let effort = 1.0 + (i % 5) as f64 * 0.37;
        let risk = 0.2 + (i % 7) as f64 * 0.1;
        item(&format!("a.C{}", i), risk, effort, risk / effort)
      })
      .collect();
    let config = OptimizerConfig {
      time_budget_ms: 0,
      ..OptimizerConfig::default()
    };
    let sel = Optimizer::from_config(&config).select_under_budget(&items, 300.0);
    assert_eq!(sel.report.method, SolveMethod::Greedy);
    assert_eq!(sel.report.fallback_reason, Some(FallbackReason::Timeout));
    assert_eq!(sel.indices, Optimizer::greedy_only().select_under_budget(&items, 300.0).indices);
    assert!(effort_of(&items, &sel) <= 300.0);
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn infeasible_constraints_return_greedy_selection_with_reason() {
    // 90% of 2.48 risk cannot fit in 2h.
    let items = four();
    let sel = Optimizer::default().select_multi_constraint(&items, Some(2.0), Some(0.9), None);
    assert_eq!(sel.report.method, SolveMethod::Greedy);
    assert_eq!(sel.report.fallback_reason, Some(FallbackReason::Infeasible));
    let greedy = Optimizer::greedy_only().select_multi_constraint(&items, Some(2.0), Some(0.9), None);
    assert_eq!(sel.indices, greedy.indices);
    assert!(effort_of(&items, &sel) <= 2.0);
  }

  #[test]
  fn pick_preserves_input_order() {
    let items = four();
    let sel = Selection::direct(vec![1, 3]);
    let picked = sel.pick(&items);
    assert_eq!(picked[0].class_name, "a.PaymentService");
    assert_eq!(picked[1].class_name, "a.UserRepository");
  }
}
