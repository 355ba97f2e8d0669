use anyhow::Context;
use clap::Parser;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use stratify::cli::{execute_command, get_log_level, Cli};
use stratify::config::{ConfigLoader, StratifyConfig};
use tracing::{debug, error, trace};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.clone()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let log_file = match init_tracing(cli.verbose, &config) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    debug!("stratify started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    if let Some(path) = log_file {
        debug!("Logging to {}", path.display());
    }

    if let Err(e) = execute_command(cli.command, config).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<StratifyConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    Ok(loader.load().await?)
}

/// Console logging filtered by verbosity, plus an optional plain-text run log
fn init_tracing(verbose: u8, config: &StratifyConfig) -> anyhow::Result<Option<PathBuf>> {
    let level = get_log_level(verbose, &config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = fmt::layer()
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3);

    let (file_layer, path) = match &config.log_dir {
        Some(dir) => {
            let (file, path) = open_run_log(dir)?;
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(path)
}

/// `<dir>/<timestamp>_run.log`, e.g. `Mon06March_1412_09_run.log`
fn open_run_log(dir: &Path) -> anyhow::Result<(File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
    let name = format!("{}_run.log", chrono::Local::now().format("%a%d%B_%H%M_%S"));
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    Ok((file, path))
}
