//! relocase CLI Binary
//!
//! Syncs a source tree into a target tree, relocating content the target
//! already holds instead of copying it again.

use anyhow::Context;
use clap::Parser;
use relocase::cli::{map_error, Cli, RunContext, EXIT_FATAL};
use relocase::error::SyncError;
use relocase::logging::init_logging;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let context = match RunContext::new(&cli) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(EXIT_FATAL);
        }
    };

    // Initialize logging early
    if let Err(e) = init_logging(&context.config().logging) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(EXIT_FATAL);
    }

    match run(&cli, &context) {
        Ok(code) => {
            info!(exit_code = code, "relocase finished");
            process::exit(code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            match e.downcast_ref::<SyncError>() {
                Some(sync_error) => eprintln!("{}", map_error(sync_error)),
                None => eprintln!("error: {:#}", e),
            }
            process::exit(EXIT_FATAL);
        }
    }
}

fn run(cli: &Cli, context: &RunContext) -> anyhow::Result<i32> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = context.execute(cli, &mut out)?;
    std::io::Write::flush(&mut out).context("Failed to flush report output")?;
    Ok(code)
}
