use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use randread_sweep::{config::Args, engines::setup_engine, report::Reporter, Device};
use tracing::info;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("randread-sweep: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let device = Arc::new(Device::open(&args.path)?);
    info!(path = ?device.path(), size = device.size(), "opened device");

    let engine = setup_engine(args.engine, args.threads.get())?;
    let sweep = randread_sweep::run(Arc::clone(&device), args.sweep_config(), engine.as_ref())?;

    let mut reporter = Reporter::new(std::io::stdout().lock(), args.output, args.abbrev);
    reporter.header(&device, args.threads.get())?;
    for round in sweep {
        reporter.round(&round?)?;
    }
    info!("sweep complete");
    Ok(())
}
