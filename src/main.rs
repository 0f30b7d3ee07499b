//! `dora_exp` command line: run a novelty detection experiment from a configuration file.

use clap::Parser;
use dora_exp::driver::absolute;
use dora_exp::{start, DoraError, DEFAULT_SEED};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// The DORA Experiment Pipeline
#[derive(Parser, Debug)]
#[command(name = "dora_exp", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    config_file: PathBuf,

    /// Output directory. If specified, it will overwrite the out_dir option in
    /// the config file.
    #[arg(short = 'o', long = "out_dir")]
    out_dir: Option<PathBuf>,

    /// Log file. If given, progress is also recorded there.
    #[arg(short = 'l', long = "log_file")]
    log_file: Option<PathBuf>,

    /// Integer used to seed the random generator for the experiment
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !cli.config_file.exists() {
        let err = DoraError::ConfigNotFound(absolute(&cli.config_file));
        eprintln!("[ERROR] {err}");
        std::process::exit(1);
    }

    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let summary = start(&cli.config_file, cli.out_dir.as_deref(), cli.seed)?;
    if !summary.is_success() {
        let failed: Vec<&str> = summary
            .failures
            .iter()
            .map(|f| f.algorithm.as_str())
            .collect();
        anyhow::bail!("{} algorithm(s) failed: {}", failed.len(), failed.join(", "));
    }
    tracing::info!(
        "Finished {} algorithm(s); results in {}",
        summary.completed.len(),
        summary.out_dir.display()
    );
    Ok(())
}

/// Human-readable stderr logging, plus a plain-text file layer when a log
/// file is requested. The returned guard flushes the file writer on drop.
fn init_tracing(
    verbose: u8,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}
