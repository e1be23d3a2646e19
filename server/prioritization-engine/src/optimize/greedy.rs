//! Deterministic greedy selection. Every sort is stable, so ties keep input order.

use std::cmp::Ordering;

use super::{Problem, RISK_EPSILON};
use crate::effort::EFFORT_FLOOR_HOURS;

/// Indices sorted by `key` descending, stable.
fn ranked_by<F>(n: usize, key: F) -> Vec<usize>
where
  F: Fn(usize) -> f64,
{
  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&a, &b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
  order
}

fn ascending(mut picked: Vec<usize>) -> Vec<usize> {
  picked.sort_unstable();
  picked
}

/// Sort by objective / effort, then take every item that still fits the
/// budget (first-fit: an oversized item is skipped, not a stopping point).
pub fn under_budget(p: &Problem<'_>, budget: f64) -> Vec<usize> {
  let order = ranked_by(p.len(), |i| p.objective[i] / p.effort[i].max(EFFORT_FLOOR_HOURS));
  let mut used = 0.0;
  let mut picked = Vec::new();
  for i in order {
    if used + p.effort[i] <= budget {
      used += p.effort[i];
      picked.push(i);
    }
  }
  ascending(picked)
}

/// Sort by objective, accumulate risk until the target is met, then stop.
pub fn for_coverage(p: &Problem<'_>, target_risk: f64) -> Vec<usize> {
  let order = ranked_by(p.len(), |i| p.objective[i]);
  let mut covered = 0.0;
  let mut picked = Vec::new();
  for i in order {
    if covered >= target_risk - RISK_EPSILON {
      break;
    }
    covered += p.risk[i];
    picked.push(i);
  }
  ascending(picked)
}

/// Sort by objective and add items while every active constraint holds.
///
/// Budget violators are skipped so a later, smaller item can still fit. The
/// walk ends at the item cap or once the coverage target is reached.
pub fn multi_constraint(
  p: &Problem<'_>,
  budget: Option<f64>,
  target_risk: Option<f64>,
  max_items: Option<usize>,
) -> Vec<usize> {
  let order = ranked_by(p.len(), |i| p.objective[i]);
  let mut used = 0.0;
  let mut covered = 0.0;
  let mut picked = Vec::new();
  for i in order {
    if max_items.is_some_and(|m| picked.len() >= m) {
      break;
    }
    if budget.is_some_and(|b| used + p.effort[i] > b) {
      continue;
    }
    if target_risk.is_some_and(|t| covered >= t - RISK_EPSILON) {
      break;
    }
    used += p.effort[i];
    covered += p.risk[i];
    picked.push(i);
  }
  ascending(picked)
}
