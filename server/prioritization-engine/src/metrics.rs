//! Plan quality metrics: Popt@20, Recall@Top20, coverage gain, and
//! side-by-side strategy comparison.
//!
//! With defect labels, an item's value is 1 if its class is flagged and 0
//! otherwise. Without labels, `risk_score` stands in for the defect signal
//! and `metric_basis` says so.

use std::collections::{BTreeMap, HashMap};

use crate::numeric::round_to;
use crate::types::{DefectLabel, MetricBasis, PlanEntry, PlanMetrics, StrategyComparison};

/// Share of total effort (Popt) and of plan items (Recall) examined.
const TOP_FRACTION: f64 = 0.2;

/// Per-item value source for the ranking metrics.
enum Valuer<'a> {
  Risk,
  Labels(HashMap<&'a str, bool>),
}

impl<'a> Valuer<'a> {
  fn new(defects: Option<&'a [DefectLabel]>) -> Self {
    match defects {
      None => Self::Risk,
      Some(labels) => Self::Labels(
        labels
          .iter()
          .map(|l| (l.class_name.as_str(), l.has_defect))
          .collect(),
      ),
    }
  }

  fn value<T: PlanEntry>(&self, item: &T) -> f64 {
    match self {
      Self::Risk => item.risk_score(),
      Self::Labels(map) => {
        if map.get(item.class_name()).copied().unwrap_or(false) {
          1.0
        } else {
          0.0
        }
      }
    }
  }
}

pub fn basis(defects: Option<&[DefectLabel]>) -> MetricBasis {
  if defects.is_some() {
    MetricBasis::DefectLabels
  } else {
    MetricBasis::RiskProxy
  }
}

/// Value captured within the first 20% of the plan's cumulative effort.
///
/// The item straddling the cut-off contributes the fraction of its value
/// that fits. `None` when the plan has no effort or there is nothing to find.
pub fn popt20<T: PlanEntry>(plan: &[T], defects: Option<&[DefectLabel]>) -> Option<f64> {
  let total_effort: f64 = plan.iter().map(|c| c.effort_hours()).sum();
  if total_effort <= 0.0 {
    return None;
  }
  let target_effort = TOP_FRACTION * total_effort;

  let valuer = Valuer::new(defects);
  let total_value = match defects {
    None => plan.iter().map(|c| c.risk_score()).sum::<f64>(),
    Some(labels) => labels.iter().filter(|l| l.has_defect).count() as f64,
  };
  if total_value <= 0.0 {
    return None;
  }

  let mut used = 0.0;
  let mut found = 0.0;
  for item in plan {
    let effort = item.effort_hours();
    if used + effort <= target_effort {
      used += effort;
      found += valuer.value(item);
    } else {
      let remaining = target_effort - used;
      if remaining > 0.0 && effort > 0.0 {
        found += valuer.value(item) * remaining / effort;
      }
      break;
    }
  }
  Some(round_to((found / total_value).clamp(0.0, 1.0), 4))
}

/// Value in the top 20% of items (at least one) over value in the whole plan.
pub fn recall_top20<T: PlanEntry>(plan: &[T], defects: Option<&[DefectLabel]>) -> Option<f64> {
  if plan.is_empty() {
    return None;
  }
  let top_k = ((TOP_FRACTION * plan.len() as f64).round() as usize).max(1);

  let valuer = Valuer::new(defects);
  let total: f64 = plan.iter().map(|c| valuer.value(c)).sum();
  if total <= 0.0 {
    return None;
  }
  let top: f64 = plan.iter().take(top_k).map(|c| valuer.value(c)).sum();
  Some(round_to((top / total).clamp(0.0, 1.0), 4))
}

/// `min(1, Σrisk)`, less the baseline when one is given (never negative).
pub fn coverage_gain<T: PlanEntry>(plan: &[T], baseline: Option<f64>) -> f64 {
  let coverage = plan.iter().map(|c| c.risk_score()).sum::<f64>().min(1.0);
  let gain = match baseline {
    Some(b) => (coverage - b).max(0.0),
    None => coverage,
  };
  round_to(gain, 4)
}

pub fn evaluate<T: PlanEntry>(
  plan: &[T],
  defects: Option<&[DefectLabel]>,
  baseline: Option<f64>,
) -> PlanMetrics {
  PlanMetrics {
    total_effort_hours: round_to(plan.iter().map(|c| c.effort_hours()).sum(), 2),
    estimated_coverage_gain: coverage_gain(plan, baseline),
    popt20_score: popt20(plan, defects),
    recall_top20: recall_top20(plan, defects),
    metric_basis: basis(defects),
  }
}

pub fn summarize<T: PlanEntry>(plan: &[T], defects: Option<&[DefectLabel]>) -> StrategyComparison {
  let avg_effort_aware_score = if plan.is_empty() {
    0.0
  } else {
    let sum: f64 = plan.iter().map(|c| c.effort_aware_score()).sum();
    round_to(sum / plan.len() as f64, 4)
  };

  StrategyComparison {
    popt20: popt20(plan, defects),
    recall_top20: recall_top20(plan, defects),
    coverage_gain: coverage_gain(plan, None),
    total_classes: plan.len(),
    total_effort_hours: round_to(plan.iter().map(|c| c.effort_hours()).sum(), 2),
    total_risk_covered: round_to(plan.iter().map(|c| c.risk_score()).sum(), 4),
    avg_effort_aware_score,
  }
}

pub fn compare<T: PlanEntry>(
  plans: &BTreeMap<String, Vec<T>>,
  defects: Option<&[DefectLabel]>,
) -> BTreeMap<String, StrategyComparison> {
  plans
    .iter()
    .map(|(name, plan)| (name.clone(), summarize(plan, defects)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::EnrichedCandidate;

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

  /// Already in rank order.
  fn plan() -> Vec<EnrichedCandidate> {
    vec![
      item("a.StringHelper", 0.45, 1.0, 0.45),
      item("a.UserRepository", 0.60, 2.0, 0.30),
      item("a.UserService", 0.75, 4.0, 0.1875),
      item("a.PaymentService", 0.68, 5.0, 0.136),
    ]
  }

  fn label(name: &str, has_defect: bool) -> DefectLabel {
    DefectLabel {
      class_name: name.into(),
      has_defect,
    }
  }

  #[test]
  fn popt20_takes_fraction_of_straddling_item() {
    // Target 2.4h: 1h whole (0.45), then 1.4/2 of 0.60 = 0.42; 0.87 / 2.48.
    assert_eq!(popt20(&plan(), None), Some(0.3508));
  }

  #[test]
  fn popt20_with_labels() {
    let labels = vec![
      label("a.StringHelper", true),
      label("a.UserService", true),
      label("a.PaymentService", false),
    ];
    assert_eq!(popt20(&plan(), Some(&labels)), Some(0.5));
    let clean = vec![label("a.StringHelper", false)];
    assert_eq!(popt20(&plan(), Some(&clean)), None);
  }

  #[test]
  fn popt20_undefined_without_effort_or_risk() {
    assert_eq!(popt20::<EnrichedCandidate>(&[], None), None);
    let zero_risk = vec![item("a.A", 0.0, 1.0, 0.0)];
    assert_eq!(popt20(&zero_risk, None), None);
  }

  #[test]
  fn recall_top20_is_count_based() {
    // round(0.8) = 1 item: 0.45 / 2.48.
    assert_eq!(recall_top20(&plan(), None), Some(0.1815));
    let labels = vec![label("a.StringHelper", true), label("a.UserService", true)];
    assert_eq!(recall_top20(&plan(), Some(&labels)), Some(0.5));
    assert_eq!(recall_top20::<EnrichedCandidate>(&[], None), None);
  }

  #[test]
  fn coverage_gain_caps_and_subtracts_baseline() {
    assert_eq!(coverage_gain(&plan(), None), 1.0);
    assert_eq!(coverage_gain(&plan(), Some(0.4)), 0.6);
    let small = vec![item("a.A", 0.2, 1.0, 0.2), item("a.B", 0.1, 1.0, 0.1)];
    assert_eq!(coverage_gain(&small, None), 0.3);
    assert_eq!(coverage_gain(&small, Some(0.5)), 0.0);
    assert_eq!(coverage_gain::<EnrichedCandidate>(&[], None), 0.0);
  }

  #[test]
  fn evaluate_reports_basis() {
    let m = evaluate(&plan(), None, None);
    assert_eq!(m.total_effort_hours, 12.0);
    assert_eq!(m.metric_basis, MetricBasis::RiskProxy);
    let m = evaluate(&plan(), Some(&[label("a.UserService", true)]), Some(0.1));
    assert_eq!(m.metric_basis, MetricBasis::DefectLabels);
    assert_eq!(m.estimated_coverage_gain, 0.9);
  }

  #[test]
  fn compare_summarizes_each_plan() {
    let mut plans = BTreeMap::new();
    plans.insert("all".to_string(), plan());
    plans.insert("none".to_string(), Vec::new());
    let out = compare(&plans, None);

    let all = &out["all"];
    assert_eq!(all.total_classes, 4);
    assert_eq!(all.total_effort_hours, 12.0);
    assert_eq!(all.total_risk_covered, 2.48);
    // (0.45 + 0.30 + 0.1875 + 0.136) / 4 = 0.268375
    assert_eq!(all.avg_effort_aware_score, 0.2684);

    let none = &out["none"];
    assert_eq!(none.total_classes, 0);
    assert_eq!(none.popt20, None);
    assert_eq!(none.avg_effort_aware_score, 0.0);
  }
}
