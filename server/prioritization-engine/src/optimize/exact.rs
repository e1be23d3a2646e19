//! Exact 0/1 selection: depth-first branch-and-bound under a wall-clock deadline.
//!
//! Items are explored in objective/effort order, include-branch first, over an
//! explicit stack so large inputs cannot exhaust the thread stack. A node
//! is pruned when the coverage target is out of reach or when its relaxation
//! bound (min of fractional knapsack, top-k remaining values, and all remaining
//! values) cannot beat the incumbent. Equal-valued solutions keep the first one
//! found, so results are deterministic.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use super::{Limits, Problem, RISK_EPSILON};
use crate::config::OptimizerConfig;
use crate::types::FallbackReason;

const VALUE_EPSILON: f64 = 1e-12;
/// Nodes expanded between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 256;

#[derive(Debug, Clone)]
pub struct ExactOptimizer {
  enabled: bool,
  time_budget: Duration,
  max_items: usize,
}

impl ExactOptimizer {
  pub fn new(enabled: bool, time_budget: Duration, max_items: usize) -> Self {
    Self {
      enabled,
      time_budget,
      max_items,
    }
  }

  pub fn from_config(config: &OptimizerConfig) -> Self {
    Self::new(
      config.exact_enabled,
      Duration::from_millis(config.time_budget_ms),
      config.max_exact_items,
    )
  }

  pub fn disabled() -> Self {
    Self::new(false, Duration::ZERO, 0)
  }

  pub fn is_available(&self) -> bool {
    self.enabled && cfg!(feature = "exact-solver")
  }

  /// Optimal indices (ascending), or the reason no optimum was produced.
  pub fn solve(&self, problem: &Problem<'_>, limits: &Limits) -> Result<Vec<usize>, FallbackReason> {
    if !self.is_available() {
      return Err(FallbackReason::Disabled);
    }
    if problem.len() > self.max_items {
      return Err(FallbackReason::TooManyItems);
    }
    let deadline = Instant::now().checked_add(self.time_budget);
    Search::new(problem, *limits, deadline).run()
  }
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
  pos: usize,
  value: f64,
  effort: f64,
  risk: f64,
  count: usize,
}

enum Step {
  Enter(Node),
  /// Include branch of `node` is finished; explore the exclude branch.
  Exclude(Node),
}

struct Search<'p> {
  problem: &'p Problem<'p>,
  limits: Limits,
  /// Item indices, best objective/effort ratio first.
  order: Vec<usize>,
  /// Positions into `order`, highest objective first (for the top-k bound).
  by_value: Vec<usize>,
  suffix_value: Vec<f64>,
  suffix_risk: Vec<f64>,
  chosen: Vec<bool>,
  best: Option<(f64, Vec<bool>)>,
  deadline: Option<Instant>,
  nodes: u64,
  timed_out: bool,
}

impl<'p> Search<'p> {
  fn new(problem: &'p Problem<'p>, limits: Limits, deadline: Option<Instant>) -> Self {
    let n = problem.len();
    let value = |i: usize| problem.objective[i].max(0.0);
    let ratio = |i: usize| {
      let e = problem.effort[i];
      if e <= 0.0 {
        f64::INFINITY
      } else {
        value(i) / e
      }
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| ratio(b).partial_cmp(&ratio(a)).unwrap_or(Ordering::Equal));

    let mut by_value: Vec<usize> = (0..n).collect();
    by_value.sort_by(|&a, &b| {
      value(order[b])
        .partial_cmp(&value(order[a]))
        .unwrap_or(Ordering::Equal)
    });

    let mut suffix_value = vec![0.0; n + 1];
    let mut suffix_risk = vec![0.0; n + 1];
    for pos in (0..n).rev() {
      suffix_value[pos] = suffix_value[pos + 1] + value(order[pos]);
      suffix_risk[pos] = suffix_risk[pos + 1] + problem.risk[order[pos]].max(0.0);
    }

    Self {
      problem,
      limits,
      order,
      by_value,
      suffix_value,
      suffix_risk,
      chosen: vec![false; n],
      best: None,
      deadline,
      nodes: 0,
      timed_out: false,
    }
  }

  fn run(mut self) -> Result<Vec<usize>, FallbackReason> {
    self.search();
    if self.timed_out {
      return Err(FallbackReason::Timeout);
    }
    let (_, chosen) = self.best.ok_or(FallbackReason::Infeasible)?;
    let mut indices: Vec<usize> = chosen
      .iter()
      .enumerate()
      .filter(|(_, c)| **c)
      .map(|(pos, _)| self.order[pos])
      .collect();
    indices.sort_unstable();
    Ok(indices)
  }

  /// Depth-first over an explicit stack; depth is bounded by the heap, not
  /// the thread stack. `chosen[pos..]` is all false whenever a node at `pos`
  /// is entered.
  fn search(&mut self) {
    let mut stack = vec![Step::Enter(Node::default())];
    while let Some(step) = stack.pop() {
      match step {
        Step::Enter(node) => {
          if !self.tick() {
            return;
          }
          if !self.expandable(&node) {
            continue;
          }
          let i = self.order[node.pos];
          let item_effort = self.problem.effort[i];
          let fits_budget = self.limits.budget.map_or(true, |b| node.effort + item_effort <= b);
          let fits_count = self.limits.max_items.map_or(true, |m| node.count < m);

          stack.push(Step::Exclude(node));
          if fits_budget && fits_count {
            self.chosen[node.pos] = true;
            stack.push(Step::Enter(Node {
              pos: node.pos + 1,
              value: node.value + self.problem.objective[i],
              effort: node.effort + item_effort,
              risk: node.risk + self.problem.risk[i],
              count: node.count + 1,
            }));
          }
        }
        Step::Exclude(node) => {
          self.chosen[node.pos] = false;
          stack.push(Step::Enter(Node {
            pos: node.pos + 1,
            ..node
          }));
        }
      }
    }
  }

  /// Counts a node; false once the deadline has passed.
  fn tick(&mut self) -> bool {
    self.nodes += 1;
    if self.nodes % DEADLINE_CHECK_INTERVAL == 0 {
      if let Some(deadline) = self.deadline {
        if Instant::now() >= deadline {
          self.timed_out = true;
          return false;
        }
      }
    }
    true
  }

  /// Prunes `node` or records it as a leaf; true when its children need exploring.
  fn expandable(&mut self, node: &Node) -> bool {
    if let Some(min_risk) = self.limits.min_risk {
      if node.risk + self.suffix_risk[node.pos] < min_risk - RISK_EPSILON {
        return false;
      }
    }

    if node.pos == self.order.len() {
      let improves = match &self.best {
        Some((best, _)) => node.value > best + VALUE_EPSILON,
        None => true,
      };
      if improves {
        self.best = Some((node.value, self.chosen.clone()));
      }
      return false;
    }

    match &self.best {
      Some((best, _)) => node.value + self.bound(node.pos, node.effort, node.count) > best + VALUE_EPSILON,
      None => true,
    }
  }

  /// Upper bound on the objective still obtainable from `order[pos..]`.
  fn bound(&self, pos: usize, effort: f64, count: usize) -> f64 {
    let mut bound = self.suffix_value[pos];
    if let Some(budget) = self.limits.budget {
      bound = bound.min(self.fractional_bound(pos, (budget - effort).max(0.0)));
    }
    if let Some(max_items) = self.limits.max_items {
      bound = bound.min(self.top_k_bound(pos, max_items.saturating_sub(count)));
    }
    bound
  }

  /// LP relaxation of the remaining knapsack (valid because `order` is by ratio).
  fn fractional_bound(&self, pos: usize, mut capacity: f64) -> f64 {
    let mut total = 0.0;
    for &i in &self.order[pos..] {
      let v = self.problem.objective[i].max(0.0);
      let e = self.problem.effort[i];
      if e <= capacity {
        capacity -= e.max(0.0);
        total += v;
      } else {
        total += v * capacity / e;
        break;
      }
    }
    total
  }

  fn top_k_bound(&self, pos: usize, k: usize) -> f64 {
    self
      .by_value
      .iter()
      .filter(|&&p| p >= pos)
      .take(k)
      .map(|&p| self.problem.objective[self.order[p]].max(0.0))
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn solver() -> ExactOptimizer {
    ExactOptimizer::new(true, Duration::from_secs(5), 2_000)
  }

  fn problem<'a>(objective: &'a [f64], effort: &'a [f64], risk: &'a [f64]) -> Problem<'a> {
    Problem {
      objective,
      effort,
      risk,
    }
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn classic_knapsack_optimum() {
    // Ratio order would take the 1h item then the 2h one (value 9); the
    // exact optimum takes the 2h + 3h items (value 11) for budget 5h.
    let objective = [4.0, 5.0, 6.0];
    let effort = [1.0, 2.0, 3.0];
    let risk = [0.2, 0.2, 0.2];
    let p = problem(&objective, &effort, &risk);
    let limits = Limits {
      budget: Some(5.0),
      ..Limits::default()
    };
    assert_eq!(solver().solve(&p, &limits).unwrap(), vec![1, 2]);
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn count_and_coverage_limits_hold() {
    let objective = [0.9, 0.8, 0.1, 0.05];
    let effort = [1.0, 1.0, 1.0, 1.0];
    let risk = [0.1, 0.1, 0.5, 0.7];
    let p = problem(&objective, &effort, &risk);
    // Need risk >= 0.7 with at most 2 items: best is {0, 3}.
    let limits = Limits {
      budget: None,
      min_risk: Some(0.7),
      max_items: Some(2),
    };
    assert_eq!(solver().solve(&p, &limits).unwrap(), vec![0, 3]);
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn unreachable_coverage_is_infeasible() {
    let objective = [0.5, 0.5];
    let effort = [4.0, 4.0];
    let risk = [0.5, 0.5];
    let p = problem(&objective, &effort, &risk);
    let limits = Limits {
      budget: Some(5.0),
      min_risk: Some(1.0),
      max_items: None,
    };
    assert_eq!(solver().solve(&p, &limits), Err(FallbackReason::Infeasible));
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn zero_time_budget_times_out_on_large_input() {
    let n = 600;
    let objective: Vec<f64> = (0..n).map(|i| 1.0 + (i % 7) as f64 * 0.13).collect();
    let effort: Vec<f64> = (0..n).map(|i| 1.0 + (i % 5) as f64 * 0.37).collect();
    let risk = vec![0.5; n];
    let p = problem(&objective, &effort, &risk);
    let limits = Limits {
      budget: Some(300.0),
      ..Limits::default()
    };
    let solver = ExactOptimizer::new(true, Duration::ZERO, 2_000);
    assert_eq!(solver.solve(&p, &limits), Err(FallbackReason::Timeout));
  }

  #[cfg(feature = "exact-solver")]
  #[test]
  fn deep_search_fits_in_a_small_thread_stack() {
    // Blocking-pool workers get 2 MiB; depth grows with the item count.
    let handle = std::thread::Builder::new()
      .stack_size(2 * 1024 * 1024)
      .spawn(|| {
        let n = 50_000;
        let objective: Vec<f64> = (0..n).map(|i| 0.1 + (i % 13) as f64 * 0.01).collect();
        let effort: Vec<f64> = (0..n).map(|i| 0.5 + (i % 7) as f64 * 0.25).collect();
        let risk: Vec<f64> = (0..n).map(|i| (i % 10) as f64 / 10.0).collect();
        let total: f64 = risk.iter().sum();
        let p = problem(&objective, &effort, &risk);
        let limits = Limits {
          min_risk: Some(total * 0.8),
          ..Limits::default()
        };
        ExactOptimizer::new(true, Duration::from_secs(30), 1_000_000)
          .solve(&p, &limits)
          .map(|v| v.len())
      })
      .unwrap();
    assert_eq!(handle.join().unwrap(), Ok(50_000));
  }

  #[test]
  fn disabled_and_oversized_report_reason() {
    let objective = [0.5, 0.5];
    let effort = [1.0, 1.0];
    let risk = [0.5, 0.5];
    let p = problem(&objective, &effort, &risk);
    let limits = Limits::default();
    assert_eq!(
      ExactOptimizer::disabled().solve(&p, &limits),
      Err(FallbackReason::Disabled)
    );
    if cfg!(feature = "exact-solver") {
      let small = ExactOptimizer::new(true, Duration::from_secs(1), 1);
      assert_eq!(small.solve(&p, &limits), Err(FallbackReason::TooManyItems));
    }
  }
}
