use vfgnsim::{bench_rollout, CancelToken, JsonExampleReader, RolloutRun, RunConfig};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Run configuration; bare names resolve under `configs/`
    #[arg(short, long = "file", default_value = "sintering.yaml")]
    file_name: String,

    /// Time the rollout loop on synthetic lattices instead of running inference
    #[arg(long)]
    bench: bool,
}

// resolve here to keep main clean
fn config_path(file_name: &str) -> PathBuf {
    let given = PathBuf::from(file_name);
    if given.exists() {
        return given;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs").join(file_name)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.bench {
        bench_rollout();
        return Ok(());
    }

    let path = config_path(&args.file_name);
    let cfg = RunConfig::from_file(&path).with_context(|| format!("failed to load {}", path.display()))?;

    let mut run = RolloutRun::build(&cfg)?;
    let examples = JsonExampleReader::open(&cfg.data.data_path, &cfg.data.eval_split)?;
    tracing::info!(split = %cfg.data.eval_split, examples = examples.len(), "initialized inference dataset");

    let summary = run.run(examples, &CancelToken::new())?;
    if !summary.failed.is_empty() {
        bail!("{} of {} examples failed", summary.failed.len(), summary.failed.len() + summary.written.len());
    }

    Ok(())
}
