//! secstat - security update status of installed packages

mod cli;
mod display;
mod setup;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use secstat_core::config::{OS_RELEASE_PATH, StatusConfig};
use secstat_core::manifest::build_manifest;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SecurityStatusArgs};
use crate::display::{OutputRenderer, render_manifest};
use crate::setup::HostSources;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = StatusConfig::resolve(cli.global.series, Path::new(OS_RELEASE_PATH))
        .context("could not determine the release series")?;
    debug!(series = %config.series, "resolved configuration");

    // Collaborators block on this runtime from the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let host = HostSources::new(&config, runtime.handle().clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::SecurityStatus(args) => security_status(&mut out, &host, &config, &args)?,
        Commands::Manifest => {
            let manifest = build_manifest(&host.index, &host.snaps)
                .context("failed to build the package manifest")?;
            render_manifest(&mut out, &manifest)?;
        }
    }
    out.flush()?;

    Ok(())
}

fn security_status(
    out: &mut impl Write,
    host: &HostSources,
    config: &StatusConfig,
    args: &SecurityStatusArgs,
) -> anyhow::Result<()> {
    let service = host.status_service(config);
    let renderer = OutputRenderer::new(args.format);

    match args.listing() {
        Some(kind) => {
            let listing = service
                .listing(kind)
                .context("failed to list installed packages")?;
            renderer.render_listing(out, &listing)?;
        }
        None => {
            let report = service
                .security_status()
                .context("failed to build the security status report")?;
            renderer.render_report(out, &report)?;
        }
    }

    Ok(())
}
