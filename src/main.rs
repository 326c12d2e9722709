//! Dockpatrol entry point
//!
//! All functional configuration comes from the process environment (see
//! `Settings`); the CLI only controls verbosity.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dockpatrol::engine::DockerCli;
use dockpatrol::process::SystemRunner;
use dockpatrol::secrets::SopsDecryptor;
use dockpatrol::{Patrol, Settings};

/// Dockpatrol - GitOps reconciliation agent for docker-compose stacks
#[derive(Parser, Debug)]
#[command(name = "dockpatrol")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            // Run-once mode with at least one failed step.
            error!("cycle completed with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = ?e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "dockpatrol=info",
        1 => "dockpatrol=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run() -> Result<bool> {
    let settings =
        Settings::from_env().context("loading configuration from the environment")?;
    info!(settings = ?settings, "starting dockpatrol");

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    }) {
        error!(error = %e, "failed to install signal handler");
    }

    let runner = SystemRunner;
    let engine = DockerCli::new(&runner);
    let decryptor = SopsDecryptor::new(settings.age_key_file.clone(), &runner);

    let patrol = Patrol::new(&settings, &runner, &engine, &decryptor);
    let report = patrol.run(&running);

    // Only run-once mode signals partial failure through the exit code; the
    // loop already retried on the next cycle.
    Ok(!settings.run_once() || report.clean())
}
