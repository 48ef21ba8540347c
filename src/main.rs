//! matflow - Main Entry Point
//!
//! Resolves the configuration, runs the pipeline to quiescence and prints
//! the run report. Diagnostics go to stderr; stdout only carries the report.

use clap::Parser;
use matflow_rs::{Cli, FlowError, PipelineBuilder, PipelineReport, ResultExt};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit status for configuration errors, matching clap's usage errors.
const USAGE_EXIT_CODE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,matflow_rs=debug"
    } else {
        "info,matflow_rs=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let is_config = e
                .downcast_ref::<FlowError>()
                .is_some_and(FlowError::is_config);
            if is_config {
                eprintln!();
                eprintln!("{}", Cli::usage());
                ExitCode::from(USAGE_EXIT_CODE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.resolve().map_err(FlowError::from)?;
    tracing::debug!(?config, "Configuration resolved");

    let pipeline = PipelineBuilder::new(config)
        .build()
        .context("Failed to build pipeline")?;
    let report = pipeline.run()?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{json}");
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!(
        "processed {} matrices in {:.3}s",
        report.decrement_pulses,
        report.elapsed.as_secs_f64()
    );
    println!(
        "  aggregates: {}, empty records: {}",
        report.aggregates.len(),
        report.empty_records
    );
    println!(
        "  peak in flight: {}, held at gate: {}",
        report.peak_in_flight, report.held
    );
}
