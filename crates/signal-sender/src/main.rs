//! `signal-sender` — posts randomised in-campus samples to a running server.
//!
//! # Usage
//!
//! ```
//! signal-sender --url http://localhost:5000 --count 100
//! signal-sender --batch 20 --count 200 --delay-ms 250
//! signal-sender --config sender.toml
//! ```

mod client;
mod generate;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use client::SignalClient;
use generate::{CAMPUS_CENTER, Generator};
use rand::{SeedableRng as _, rngs::StdRng};
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:5000";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "signal-sender", about = "Post random samples to a campus signal mapper")]
struct Args {
  /// Path to a TOML config file (url, count, batch, delay_ms, spread, center).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the server (default: http://localhost:5000).
  #[arg(long, env = "SIGNAL_URL")]
  url: Option<String>,

  /// Number of samples to send (default: 100).
  #[arg(short = 'n', long)]
  count: Option<usize>,

  /// Send samples in batches of this size instead of one at a time.
  #[arg(short, long)]
  batch: Option<usize>,

  /// Pause between requests, in milliseconds (default: 50).
  #[arg(long)]
  delay_ms: Option<u64>,

  /// Maximum offset from the campus centre, in degrees (default: 0.003).
  #[arg(long)]
  spread: Option<f64>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct ConfigFile {
  url:      Option<String>,
  count:    Option<usize>,
  batch:    Option<usize>,
  delay_ms: Option<u64>,
  spread:   Option<f64>,
  center:   Option<[f64; 2]>,
}

/// Effective settings after merging flags, file and defaults.
#[derive(Debug, PartialEq)]
struct Plan {
  url:       String,
  count:     usize,
  batch:     usize,
  delay:     Duration,
  generator: (f64, f64, f64),
}

impl Plan {
  /// CLI flags override the config file, which overrides defaults.
  fn resolve(args: Args, file: ConfigFile) -> Result<Self> {
    let [lat, lng] = file.center.unwrap_or([CAMPUS_CENTER.0, CAMPUS_CENTER.1]);
    if !(lat.is_finite() && lng.is_finite()) {
      bail!("center must be finite, got [{lat}, {lng}]");
    }
    let spread = args.spread.or(file.spread).unwrap_or(0.003);
    if !spread.is_finite() {
      bail!("spread must be a finite number of degrees, got {spread}");
    }
    Ok(Self {
      url:       args.url.or(file.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
      count:     args.count.or(file.count).unwrap_or(100),
      batch:     args.batch.or(file.batch).unwrap_or(1).max(1),
      delay:     Duration::from_millis(args.delay_ms.or(file.delay_ms).unwrap_or(50)),
      generator: (lat, lng, spread),
    })
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let plan = Plan::resolve(args, file_cfg)?;
  let (lat, lng, spread) = plan.generator;
  let generator = Generator { center: (lat, lng), spread };
  let client = SignalClient::new(&plan.url)?;
  let mut rng = StdRng::from_entropy();

  info!(url = %plan.url, count = plan.count, batch = plan.batch, "sending samples");

  let mut sent = 0;
  while sent < plan.count {
    let n = plan.batch.min(plan.count - sent);
    let now = chrono::Utc::now().timestamp();
    let samples: Vec<_> = (0..n).map(|_| generator.sample(&mut rng, now)).collect();

    let (status, body) = if plan.batch == 1 {
      client.submit(&samples[0]).await?
    } else {
      client.submit_batch(&samples).await?
    };
    println!("{status} {body}");

    sent += n;
    if sent < plan.count {
      tokio::time::sleep(plan.delay).await;
    }
  }

  info!(sent, "done");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(extra: &[&str]) -> Args {
    Args::parse_from(std::iter::once("signal-sender").chain(extra.iter().copied()))
  }

  #[test]
  fn defaults_apply_without_flags_or_file() {
    let plan = Plan::resolve(args(&[]), ConfigFile::default()).unwrap();
    assert_eq!(plan.url, DEFAULT_URL);
    assert_eq!(plan.count, 100);
    assert_eq!(plan.batch, 1);
    assert_eq!(plan.delay, Duration::from_millis(50));
    assert_eq!(plan.generator, (CAMPUS_CENTER.0, CAMPUS_CENTER.1, 0.003));
  }

  #[test]
  fn flags_override_file() {
    let file: ConfigFile = toml::from_str(
      r#"
        url = "http://campus.example:8000"
        count = 10
        batch = 5
        center = [1.0, 2.0]
      "#,
    )
    .unwrap();
    let plan = Plan::resolve(args(&["--count", "3", "--spread", "0.001"]), file).unwrap();
    assert_eq!(plan.url, "http://campus.example:8000");
    assert_eq!(plan.count, 3);
    assert_eq!(plan.batch, 5);
    assert_eq!(plan.generator, (1.0, 2.0, 0.001));
  }

  #[test]
  fn zero_batch_means_single_posts() {
    let plan = Plan::resolve(args(&["--batch", "0"]), ConfigFile::default()).unwrap();
    assert_eq!(plan.batch, 1);
  }

  #[test]
  fn non_finite_spread_is_rejected() {
    for bad in ["nan", "inf"] {
      let err = Plan::resolve(args(&["--spread", bad]), ConfigFile::default()).unwrap_err();
      assert!(err.to_string().contains("spread"), "{bad}: {err}");
    }

    let file: ConfigFile = toml::from_str("spread = nan").unwrap();
    assert!(Plan::resolve(args(&[]), file).is_err());
  }
}
