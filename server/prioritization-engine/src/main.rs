//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is a PrioritizeRequest. Output lines are either:
//! - A PlanResponse (or a ComparisonResponse with `--compare`)
//! - An ErrorOutput (when the request is rejected or its data is unavailable)
//!
//! Logs go to stderr so stdout stays pure JSON.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use prioritization_engine::provider::{DEFAULT_HTTP_TIMEOUT, ENV_ML_SERVICE_API_KEY};
use prioritization_engine::types::ErrorOutput;
use prioritization_engine::{Engine, EngineConfig, HttpProvider, JsonDirProvider, PrioritizeRequest};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prioritization-engine")]
#[command(about = "Turn per-class risk predictions into a ranked, effort-bounded test plan.")]
struct Cli {
  /// TOML config file. Defaults to $PRIORITIZER_CONFIG, then built-in defaults.
  #[arg(short = 'c', long = "config", value_name = "PATH")]
  config: Option<PathBuf>,

  /// Emit a comparison of every strategy instead of a single plan.
  #[arg(long)]
  compare: bool,

  /// Root of `<repo>[/<branch>]/<sprint|latest>.json` prediction files, used
  /// for requests without inline predictions.
  #[arg(long = "predictions-dir", value_name = "DIR")]
  predictions_dir: Option<PathBuf>,

  /// Base URL of the ML prediction service, used when no predictions dir is
  /// given. The bearer token comes from $ML_SERVICE_API_KEY.
  #[arg(long = "predictions-url", value_name = "URL")]
  predictions_url: Option<String>,
}

fn main() {
  let cli = Cli::parse();
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let config = match &cli.config {
    Some(path) => EngineConfig::load(path).and_then(|c| c.with_overrides(|k| std::env::var(k).ok())),
    None => EngineConfig::load_from_env(),
  };
  let config = match config {
    Ok(c) => c,
    Err(e) => {
      let _ = writeln!(io::stderr(), "prioritization-engine: {}", e);
      std::process::exit(1);
    }
  };

  let mut engine = Engine::new(config);
  if let Some(dir) = &cli.predictions_dir {
    engine = engine.with_provider(Arc::new(JsonDirProvider::new(dir)));
  } else if let Some(url) = &cli.predictions_url {
    let api_key = std::env::var(ENV_ML_SERVICE_API_KEY).ok();
    match HttpProvider::new(url, api_key, DEFAULT_HTTP_TIMEOUT) {
      Ok(provider) => engine = engine.with_provider(Arc::new(provider)),
      Err(e) => {
        let _ = writeln!(io::stderr(), "prioritization-engine: {}", e);
        std::process::exit(1);
      }
    }
  }

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "prioritization-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let req: PrioritizeRequest = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        emit(&mut out, &ErrorOutput::new("validation", format!("json parse: {}", e)));
        continue;
      }
    };

    let result = if cli.compare {
      engine.compare_strategies(&req).map(|c| emit(&mut out, &c))
    } else {
      engine.prioritize(&req).map(|p| emit(&mut out, &p))
    };
    if let Err(e) = result {
      emit(&mut out, &ErrorOutput::from(&e));
    }
  }

  let _ = out.flush();
}

fn emit<W: Write, T: Serialize>(out: &mut W, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}
