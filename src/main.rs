//! bookbinder CLI entry point

use bookbinder::config::{Cli, Settings};
use bookbinder::pipeline;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments; help counts as "nothing processed" and exits 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    // Initialize logging
    init_logging(&cli);

    // Build settings from CLI
    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage_hint();
            return ExitCode::FAILURE;
        }
    };

    // Run the pipeline
    match pipeline::run(&settings) {
        Ok(result) => {
            for output in &result.outputs {
                println!("{}", output.display());
            }
            for failure in &result.failures {
                eprintln!(
                    "Failed {} while {}: {}",
                    failure.source, failure.stage, failure.error
                );
            }
            if result.total_jobs > 1 || result.failed > 0 {
                println!(
                    "Summary: {} written, {} failed (of {} sources)",
                    result.successful, result.failed, result.total_jobs
                );
            }

            if result.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_usage() {
                print_usage_hint();
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = cli.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage_hint() {
    let usage = Cli::command().render_usage();
    eprintln!("\n{}\nRun with -h for details.", usage);
}
