//! Probe run command.

use crate::report::ConsoleReporter;
use anyhow::{bail, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use probe_core::{catalogue, Reporter, RunReport, Sequencer, SilentReporter, SuiteKind};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Options for a run.
pub struct RunOptions {
    pub suites: Vec<SuiteKind>,
    pub include_protected: bool,
    pub startup_delay: Option<u64>,
    pub receive_timeout: Option<u64>,
    pub format: String,
}

/// Run the selected suites and map the report to an exit status.
pub fn run(config_path: &Path, options: RunOptions) -> Result<ExitCode> {
    let json = match options.format.as_str() {
        "text" => false,
        "json" => true,
        other => bail!("Unknown format '{}'. Use 'text' or 'json'.", other),
    };

    let mut config = super::load_config(config_path)?;
    if let Some(secs) = options.startup_delay {
        config.timeouts.startup_delay_secs = secs;
    }
    if let Some(ms) = options.receive_timeout {
        config.timeouts.receive_timeout_ms = ms;
    }
    let include_protected = options.include_protected || config.suites.include_protected_registry;
    let suites = catalogue(&options.suites, include_protected);

    let sequencer =
        Sequencer::from_config(&config).context("Failed to set up service clients")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let report = runtime.block_on(async {
        let cancel = sequencer.cancel_handle();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; cancelling run");
                interrupt.cancel();
            }
        });

        wait_for_services(config.timeouts.startup_delay(), &cancel).await?;

        let mut console = ConsoleReporter::new();
        let mut silent = SilentReporter;
        let reporter: &mut dyn Reporter = if json { &mut silent } else { &mut console };
        anyhow::Ok(sequencer.run(&suites, reporter).await)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(ExitCode::from(report.exit_code()))
}

/// Sleeps for `delay` behind a spinner. Returns early once `cancel` fires.
async fn wait_for_services(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    if delay.is_zero() {
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message("Waiting for services to start...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    tokio::select! {
        _ = cancel.cancelled() => info!("startup wait interrupted"),
        _ = tokio::time::sleep(delay) => {}
    }

    spinner.finish_and_clear();
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", style("Summary:").bold());
    println!("  Passed:     {}", style(report.passed).green());
    println!("  Failed:     {}", style(report.failed).red());
    if report.abandoned > 0 {
        println!("  Abandoned:  {}", style(report.abandoned).yellow());
    }
    if report.skipped > 0 {
        println!("  Skipped:    {}", style(report.skipped).dim());
    }

    if let Some(reason) = &report.abort_reason {
        println!();
        println!("{} Run aborted: {}", style("✗").red().bold(), reason);
    } else {
        println!();
        println!("{} All tests completed.", style("✓").green());
    }
}
