//! Stable content fingerprint for a produced plan.

use crate::types::PrioritizedItem;

/// `plan-` + first 16 hex chars of blake3 over strategy and ranked classes.
///
/// Same strategy and same ranking give the same id; it is not a persisted
/// identity.
pub fn plan_id(strategy: &str, plan: &[PrioritizedItem]) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(strategy.as_bytes());
  for item in plan {
    hasher.update(b"|");
    hasher.update(item.class_name.as_bytes());
    hasher.update(b":");
    hasher.update(item.priority.to_string().as_bytes());
  }

  let hex = hasher.finalize().to_hex();
  format!("plan-{}", &hex[..16])
}
