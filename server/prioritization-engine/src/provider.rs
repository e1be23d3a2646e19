//! Where predictions come from when a request does not carry them inline.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::Candidate;

/// Sprint file name used when a request names no sprint.
const LATEST: &str = "latest";

/// Base URL of the ML prediction service.
pub const ENV_ML_SERVICE_URL: &str = "ML_SERVICE_URL";
/// Bearer token for the ML prediction service; empty means none.
pub const ENV_ML_SERVICE_API_KEY: &str = "ML_SERVICE_API_KEY";
pub const DEFAULT_ML_SERVICE_URL: &str = "http://localhost:8005";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PREDICTIONS_PATH: &str = "/api/v1/predictions";

/// Lookup key for one prediction list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
  pub repository_id: String,
  pub branch: Option<String>,
  pub sprint_id: Option<String>,
}

impl PlanKey {
  pub fn new(repository_id: impl Into<String>) -> Self {
    Self {
      repository_id: repository_id.into(),
      branch: None,
      sprint_id: None,
    }
  }

  pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
    self.branch = Some(branch.into());
    self
  }

  pub fn with_sprint(mut self, sprint_id: impl Into<String>) -> Self {
    self.sprint_id = Some(sprint_id.into());
    self
  }
}

impl fmt::Display for PlanKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.repository_id)?;
    if let Some(branch) = &self.branch {
      write!(f, "/{}", branch)?;
    }
    if let Some(sprint) = &self.sprint_id {
      write!(f, "@{}", sprint)?;
    }
    Ok(())
  }
}

/// Source of risk predictions. Failures surface as `EngineError::Upstream`.
pub trait PredictionsProvider: Send + Sync {
  fn fetch(&self, key: &PlanKey) -> Result<Vec<Candidate>>;
}

/// In-memory predictions, keyed exactly.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
  entries: HashMap<PlanKey, Vec<Candidate>>,
}

impl StaticProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: PlanKey, candidates: Vec<Candidate>) -> Self {
    self.entries.insert(key, candidates);
    self
  }
}

impl PredictionsProvider for StaticProvider {
  fn fetch(&self, key: &PlanKey) -> Result<Vec<Candidate>> {
    self
      .entries
      .get(key)
      .cloned()
      .ok_or_else(|| EngineError::upstream(format!("no predictions for {}", key)))
  }
}

/// Reads `<root>/<repository_id>[/<branch>]/<sprint_id|latest>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
  root: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PredictionsFile {
  List(Vec<Candidate>),
  Wrapped { predictions: Vec<Candidate> },
}

impl JsonDirProvider {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// File for `key`. Key segments may not escape the root.
  pub fn path_for(&self, key: &PlanKey) -> Result<PathBuf> {
    let mut path = self.root.join(segment("repository_id", &key.repository_id)?);
    if let Some(branch) = &key.branch {
      path.push(segment("branch", branch)?);
    }
    let sprint = match &key.sprint_id {
      Some(s) => segment("sprint_id", s)?,
      None => LATEST,
    };
    path.push(format!("{}.json", sprint));
    Ok(path)
  }
}

fn segment<'a>(field: &str, value: &'a str) -> Result<&'a str> {
  let value = value.trim();
  if value.is_empty()
    || value == "."
    || value.contains("..")
    || value.contains('/')
    || value.contains('\\')
  {
    return Err(EngineError::validation(field, "not a valid path segment"));
  }
  Ok(value)
}

impl PredictionsFile {
  fn into_candidates(self) -> Vec<Candidate> {
    match self {
      PredictionsFile::List(list) => list,
      PredictionsFile::Wrapped { predictions } => predictions,
    }
  }
}

impl PredictionsProvider for JsonDirProvider {
  fn fetch(&self, key: &PlanKey) -> Result<Vec<Candidate>> {
    let path = self.path_for(key)?;
    let raw = fs::read_to_string(&path).map_err(|e| {
      EngineError::upstream(format!("predictions for {} unavailable ({}): {}", key, path.display(), e))
    })?;
    let parsed: PredictionsFile = serde_json::from_str(&raw).map_err(|e| {
      EngineError::upstream(format!("predictions for {} malformed ({}): {}", key, path.display(), e))
    })?;
    let candidates = parsed.into_candidates();
    debug!(key = %key, count = candidates.len(), "predictions loaded");
    Ok(candidates)
  }
}

/// Predictions from the ML service: `GET {base_url}/api/v1/predictions`
/// with `repository_id`, `branch` and `sprint_id` query parameters.
///
/// Uses a blocking client; call it from a blocking context (the engine runs
/// on `spawn_blocking` in the service), never directly on an async task.
#[derive(Debug, Clone)]
pub struct HttpProvider {
  client: reqwest::blocking::Client,
  base_url: String,
  api_key: Option<String>,
}

impl HttpProvider {
  pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| EngineError::config(format!("http client: {}", e)))?;
    Ok(Self {
      client,
      base_url: base_url.trim().trim_end_matches('/').to_string(),
      api_key: api_key.filter(|k| !k.trim().is_empty()),
    })
  }

  /// `ML_SERVICE_URL` (default `http://localhost:8005`) and `ML_SERVICE_API_KEY`.
  pub fn from_env() -> Result<Self> {
    let base_url = std::env::var(ENV_ML_SERVICE_URL)
      .ok()
      .filter(|u| !u.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_ML_SERVICE_URL.to_string());
    Self::new(&base_url, std::env::var(ENV_ML_SERVICE_API_KEY).ok(), DEFAULT_HTTP_TIMEOUT)
  }

  pub fn endpoint(&self) -> String {
    format!("{}{}", self.base_url, PREDICTIONS_PATH)
  }
}

impl PredictionsProvider for HttpProvider {
  fn fetch(&self, key: &PlanKey) -> Result<Vec<Candidate>> {
    let mut query = vec![("repository_id", key.repository_id.as_str())];
    if let Some(branch) = &key.branch {
      query.push(("branch", branch.as_str()));
    }
    if let Some(sprint) = &key.sprint_id {
      query.push(("sprint_id", sprint.as_str()));
    }

    let mut request = self.client.get(self.endpoint()).query(&query);
    if let Some(token) = &self.api_key {
      request = request.bearer_auth(token);
    }
    let response = request
      .send()
      .and_then(|r| r.error_for_status())
      .map_err(|e| EngineError::upstream(format!("predictions for {} unavailable: {}", key, e)))?;
    let parsed: PredictionsFile = response
      .json()
      .map_err(|e| EngineError::upstream(format!("predictions for {} malformed: {}", key, e)))?;

    let candidates = parsed.into_candidates();
    debug!(key = %key, count = candidates.len(), "predictions fetched");
    Ok(candidates)
  }
}
