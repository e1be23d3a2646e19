//! Property-based tests for plan invariants: effort bounds, constraint
//! satisfaction, ranking order and metric ranges.

use proptest::prelude::*;

use prioritization_engine::config::{CriticalityConfig, EffortConfig};
use prioritization_engine::optimize::Optimizer;
use prioritization_engine::strategy;
use prioritization_engine::types::{Candidate, EnrichedCandidate, SolveMethod};
use prioritization_engine::{criticality, effort, metrics};

const PACKAGES: [&str; 5] = ["auth", "payment", "database", "api", "utils"];

fn arb_candidates(max: usize) -> impl Strategy<Value = Vec<Candidate>> {
  prop::collection::vec(
    (0.0f64..=1.0, -10i64..2_000, 0.0f64..40.0, 0u32..30, 0u32..15, 0usize..PACKAGES.len()),
    0..max,
  )
  .prop_map(|rows| {
    rows
      .into_iter()
      .enumerate()
      .map(|(i, (risk, loc, cc, methods, deps, pkg))| Candidate {
        num_methods: methods,
        num_dependencies: deps,
        ..Candidate::new(format!("com.example.{}.C{}", PACKAGES[pkg], i), risk, loc, cc)
      })
      .collect()
  })
}

fn enrich(raw: &[Candidate]) -> Vec<EnrichedCandidate> {
  criticality::enrich(&CriticalityConfig::default(), effort::enrich(&EffortConfig::default(), raw))
}

fn total_effort(items: &[EnrichedCandidate]) -> f64 {
  items.iter().map(|c| c.effort_hours).sum()
}

fn is_ranked(items: &[EnrichedCandidate]) -> bool {
  items.windows(2).all(|w| w[0].effort_aware_score >= w[1].effort_aware_score)
}

proptest! {
  #[test]
  fn enriched_effort_within_bounds(raw in arb_candidates(30)) {
    let config = EffortConfig::default();
    for c in enrich(&raw) {
      prop_assert!((0.0..=1.0).contains(&c.risk_score));
      prop_assert!(c.effort_hours >= config.min_effort_hours);
      prop_assert!(c.effort_hours <= config.max_effort_hours);
      prop_assert!(c.module_criticality.is_some());
    }
  }

  #[test]
  fn top_k_size_and_order(raw in arb_candidates(30), k in 1usize..40) {
    let items = enrich(&raw);
    let out = strategy::top_k(&items, k);
    prop_assert_eq!(out.items.len(), k.min(items.len()));
    prop_assert!(is_ranked(&out.items));
  }

  #[test]
  fn budget_never_exceeded(raw in arb_candidates(12), budget in 0.0f64..60.0) {
    let items = enrich(&raw);
    for opt in [Optimizer::default(), Optimizer::greedy_only()] {
      let out = strategy::budget_constrained(&opt, &items, budget);
      prop_assert!(total_effort(&out.items) <= budget + 1e-9);
      prop_assert!(is_ranked(&out.items));
      if budget == 0.0 {
        prop_assert!(out.items.is_empty());
      }
    }
  }

  #[test]
  fn exact_never_worse_than_greedy(raw in arb_candidates(12), budget in 0.5f64..30.0) {
    let items = enrich(&raw);
    let score = |v: &[EnrichedCandidate]| v.iter().map(|c| c.effort_aware_score).sum::<f64>();
    let exact = strategy::budget_constrained(&Optimizer::default(), &items, budget);
    let greedy = strategy::budget_constrained(&Optimizer::greedy_only(), &items, budget);
    if exact.report.method == SolveMethod::Exact {
      prop_assert!(score(&exact.items) + 1e-9 >= score(&greedy.items));
    }
  }

  #[test]
  fn full_coverage_keeps_everything(raw in arb_candidates(20)) {
    let items = enrich(&raw);
    let out = strategy::coverage_constrained(&Optimizer::default(), &items, 1.0);
    prop_assert_eq!(out.items.len(), items.len());
  }

  #[test]
  fn multi_objective_honors_constraints(
    raw in arb_candidates(12),
    budget in proptest::option::of(1.0f64..40.0),
    coverage in proptest::option::of(0.05f64..1.0),
    max_items in proptest::option::of(1usize..6),
  ) {
    let items = enrich(&raw);
    let out = strategy::multi_objective(&Optimizer::default(), &items, budget, coverage, max_items);
    if let Some(b) = budget {
      prop_assert!(total_effort(&out.items) <= b + 1e-9);
    }
    if let Some(m) = max_items {
      prop_assert!(out.items.len() <= m);
    }
    if let (Some(t), SolveMethod::Exact) = (coverage, out.report.method) {
      let total: f64 = items.iter().map(|c| c.risk_score).sum();
      let covered: f64 = out.items.iter().map(|c| c.risk_score).sum();
      prop_assert!(covered >= total * t - 1e-6);
    }
    prop_assert!(is_ranked(&out.items));
  }

  #[test]
  fn metrics_stay_in_unit_range(raw in arb_candidates(30), baseline in proptest::option::of(0.0f64..=1.0)) {
    let plan = strategy::maximize_score(&enrich(&raw)).items;
    let m = metrics::evaluate(&plan, None, baseline);
    for v in [m.popt20_score, m.recall_top20].into_iter().flatten() {
      prop_assert!((0.0..=1.0).contains(&v));
    }
    prop_assert!((0.0..=1.0).contains(&m.estimated_coverage_gain));
  }
}
