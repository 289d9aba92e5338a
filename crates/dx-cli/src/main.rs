//! dx CLI

mod input;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

use dx_core::Error;
use dx_prob::{Distribution, kl_divergence};

use crate::input::{DistributionSpec, NdValue, array_to_json};

#[derive(Parser)]
#[command(name = "dx")]
#[command(about = "dx - evaluate, sample and compare probability distributions")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log density (or mass) and density at the given points
    LogProb {
        /// Distribution description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Points to evaluate, as a JSON number or nested array
        #[arg(long, allow_hyphen_values = true)]
        x: String,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Log CDF and CDF at the given points
    Cdf {
        /// Distribution description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Points to evaluate, as a JSON number or nested array
        #[arg(long, allow_hyphen_values = true)]
        x: String,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw samples
    Sample {
        /// Distribution description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of draws per batch member
        #[arg(short = 'n', long, default_value = "1")]
        num_samples: usize,

        /// RNG seed; the same seed reproduces the same draws
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summary statistics that have a closed form
    Stats {
        /// Distribution description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// KL divergence KL(input || other)
    Kl {
        /// First distribution (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Second distribution (JSON)
        #[arg(long)]
        other: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::LogProb { input, x, output } => cmd_log_prob(&input, &x, output.as_ref()),
        Commands::Cdf { input, x, output } => cmd_cdf(&input, &x, output.as_ref()),
        Commands::Sample { input, num_samples, seed, output } => {
            cmd_sample(&input, num_samples, seed, output.as_ref())
        }
        Commands::Stats { input, output } => cmd_stats(&input, output.as_ref()),
        Commands::Kl { input, other, output } => cmd_kl(&input, &other, output.as_ref()),
    }
}

fn load(path: &PathBuf) -> Result<Box<dyn Distribution>> {
    DistributionSpec::from_path(path)?.build()
}

fn cmd_log_prob(input: &PathBuf, x: &str, output: Option<&PathBuf>) -> Result<()> {
    let dist = load(input)?;
    let x = NdValue::parse(x)?.to_array()?;
    let log_prob = dist.log_prob(&x)?;
    let prob = dist.prob(&x)?;
    tracing::info!(points = x.len(), "log_prob complete");
    write_json(
        output,
        json!({
            "distribution": dist.name(),
            "log_prob": array_to_json(&log_prob),
            "prob": array_to_json(&prob),
        }),
    )
}

fn cmd_cdf(input: &PathBuf, x: &str, output: Option<&PathBuf>) -> Result<()> {
    let dist = load(input)?;
    let x = NdValue::parse(x)?.to_array()?;
    let log_cdf = dist.log_cdf(&x)?;
    let cdf = dist.cdf(&x)?;
    tracing::info!(points = x.len(), "cdf complete");
    write_json(
        output,
        json!({
            "distribution": dist.name(),
            "log_cdf": array_to_json(&log_cdf),
            "cdf": array_to_json(&cdf),
        }),
    )
}

fn cmd_sample(input: &PathBuf, num_samples: usize, seed: u64, output: Option<&PathBuf>) -> Result<()> {
    let dist = load(input)?;
    let samples = dist.sample_with_seed(&[num_samples], seed)?;
    tracing::info!(n = num_samples, seed, "sampling complete");
    write_json(
        output,
        json!({
            "distribution": dist.name(),
            "dtype": dist.dtype().name(),
            "seed": seed,
            "shape": samples.shape(),
            "samples": array_to_json(&samples),
        }),
    )
}

fn cmd_stats(input: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let dist = load(input)?;
    let mut out = Map::new();
    out.insert("distribution".into(), json!(dist.name()));
    out.insert("family".into(), json!(dist.family()));
    out.insert("batch_shape".into(), json!(dist.batch_shape()?));
    out.insert("event_shape".into(), json!(dist.event_shape()?));

    let stats: [(&str, dx_core::Result<ndarray::ArrayD<f64>>); 6] = [
        ("mean", dist.mean()),
        ("variance", dist.variance()),
        ("stddev", dist.stddev()),
        ("mode", dist.mode()),
        ("entropy", dist.entropy()),
        ("covariance", dist.covariance()),
    ];
    for (name, value) in stats {
        match value {
            Ok(v) => {
                out.insert(name.into(), array_to_json(&v));
            }
            Err(e @ (Error::NotImplemented(_) | Error::Undefined(_))) => {
                tracing::debug!(stat = name, error = %e, "statistic skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(family = %dist.family(), "stats complete");
    write_json(output, Value::Object(out))
}

fn cmd_kl(input: &PathBuf, other: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let a = load(input)?;
    let b = load(other)?;
    let kl = kl_divergence(a.as_ref(), b.as_ref())?;
    tracing::info!(a = a.name(), b = b.name(), "kl complete");
    write_json(
        output,
        json!({
            "p": a.name(),
            "q": b.name(),
            "kl": array_to_json(&kl),
        }),
    )
}

fn write_json(output: Option<&PathBuf>, value: Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
