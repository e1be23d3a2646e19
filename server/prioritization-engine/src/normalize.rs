//! Validate inbound predictions and constraints before any computation.

use std::collections::HashSet;

use crate::error::{EngineError, Result};
use crate::types::{Candidate, Constraints};

/// Check and normalize raw predictions.
///
/// Class names are trimmed and must be unique within the request. Risk must be
/// in [0, 1]; complexity must be finite and non-negative. Non-positive LOC is
/// accepted (it maps to the minimum effort).
pub fn normalize_candidates(raw: &[Candidate]) -> Result<Vec<Candidate>> {
  let mut seen = HashSet::with_capacity(raw.len());
  raw
    .iter()
    .enumerate()
    .map(|(i, c)| {
      let class_name = c.class_name.trim().to_string();
      if class_name.is_empty() {
        return Err(EngineError::validation(
          &format!("predictions[{}].class_name", i),
          "must not be empty",
        ));
      }
      if !seen.insert(class_name.clone()) {
        return Err(EngineError::validation(
          &format!("predictions[{}].class_name", i),
          &format!("duplicate class {}", class_name),
        ));
      }
      if !(c.risk_score.is_finite() && (0.0..=1.0).contains(&c.risk_score)) {
        return Err(EngineError::validation(
          &format!("predictions[{}].risk_score", i),
          "must be in [0, 1]",
        ));
      }
      if !(c.cyclomatic_complexity.is_finite() && c.cyclomatic_complexity >= 0.0) {
        return Err(EngineError::validation(
          &format!("predictions[{}].cyclomatic_complexity", i),
          "must be a non-negative number",
        ));
      }
      Ok(Candidate {
        class_name,
        ..c.clone()
      })
    })
    .collect()
}

/// Range-check constraints. Absent fields are not checked.
pub fn validate_constraints(c: &Constraints) -> Result<()> {
  if let Some(b) = c.budget_hours {
    if !(b.is_finite() && b > 0.0) {
      return Err(EngineError::validation("budget_hours", "must be > 0"));
    }
  }
  if let Some(t) = c.target_coverage {
    if !(t.is_finite() && t > 0.0 && t <= 1.0) {
      return Err(EngineError::validation("target_coverage", "must be in (0, 1]"));
    }
  }
  if c.k == Some(0) {
    return Err(EngineError::validation("k", "must be > 0"));
  }
  if c.max_items == Some(0) {
    return Err(EngineError::validation("max_classes", "must be > 0"));
  }
  Ok(())
}

pub fn validate_baseline(baseline: Option<f64>) -> Result<()> {
  match baseline {
    Some(b) if !(b.is_finite() && (0.0..=1.0).contains(&b)) => Err(EngineError::validation(
      "baseline_coverage",
      "must be in [0, 1]",
    )),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_and_accepts_valid_predictions() {
    let raw = vec![
      Candidate::new("  com.example.auth.UserService ", 0.75, 150, 12.0),
      Candidate::new("com.example.Empty", 0.0, 0, 0.0),
    ];
    let out = normalize_candidates(&raw).unwrap();
    assert_eq!(out[0].class_name, "com.example.auth.UserService");
    assert_eq!(out.len(), 2);
  }

  #[test]
  fn rejects_risk_out_of_range() {
    let raw = vec![Candidate::new("a.B", 1.2, 10, 1.0)];
    let err = normalize_candidates(&raw).unwrap_err();
    assert!(err.to_string().contains("predictions[0].risk_score"));

    let raw = vec![Candidate::new("a.B", f64::NAN, 10, 1.0)];
    assert!(normalize_candidates(&raw).is_err());
  }

  #[test]
  fn rejects_duplicate_class_names() {
    let raw = vec![
      Candidate::new("a.B", 0.5, 10, 1.0),
      Candidate::new("a.B", 0.4, 20, 1.0),
    ];
    let err = normalize_candidates(&raw).unwrap_err();
    assert!(err.to_string().contains("predictions[1].class_name"));
  }

  #[test]
  fn rejects_negative_complexity() {
    let raw = vec![Candidate::new("a.B", 0.5, 10, -1.0)];
    assert!(normalize_candidates(&raw).is_err());
  }

  #[test]
  fn constraint_ranges() {
    assert!(validate_constraints(&Constraints::default()).is_ok());
    let ok = Constraints {
      budget_hours: Some(8.0),
      target_coverage: Some(1.0),
      max_items: Some(3),
      k: Some(1),
    };
    assert!(validate_constraints(&ok).is_ok());

    for bad in [
      Constraints { budget_hours: Some(0.0), ..Default::default() },
      Constraints { budget_hours: Some(-1.0), ..Default::default() },
      Constraints { target_coverage: Some(0.0), ..Default::default() },
      Constraints { target_coverage: Some(1.01), ..Default::default() },
      Constraints { k: Some(0), ..Default::default() },
      Constraints { max_items: Some(0), ..Default::default() },
    ] {
      let err = validate_constraints(&bad).unwrap_err();
      assert!(err.is_validation(), "{:?} should be a validation error", bad);
    }
  }

  #[test]
  fn baseline_range() {
    assert!(validate_baseline(None).is_ok());
    assert!(validate_baseline(Some(0.4)).is_ok());
    assert!(validate_baseline(Some(-0.1)).is_err());
  }
}
