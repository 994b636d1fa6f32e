mod cli;
mod config;
mod database;
mod error;
mod mailer;
mod pipeline;
mod report;
mod summary;
mod ui;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use console::Term;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::{DB_CONNECTION_STRING, EmailSettings, JobArguments, ReportConfig};
use database::SqliteFetcher;
use pipeline::ReportJob;
use ui::{RunProgress, Stream};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("report run failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "rpa_report=debug"
    } else {
        "rpa_report=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let config = ReportConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let fetcher = SqliteFetcher::new(config.constant(DB_CONNECTION_STRING)?);

    match &cli.command {
        Command::Run => {
            // Arguments are validated before any query runs.
            let args = JobArguments::parse(&cli.job_arguments()?)?;
            let settings = EmailSettings::new(&args, &config);
            let job = ReportJob::new(
                fetcher,
                Local::now().naive_local(),
                config.failure_window_days,
            );
            send_report(cli, &job, &settings)
        }
        Command::Preview { output } => {
            let job = ReportJob::new(
                fetcher,
                Local::now().naive_local(),
                config.failure_window_days,
            );
            preview_report(cli, &job, output.as_deref())
        }
    }
}

fn send_report(cli: &Cli, job: &ReportJob<SqliteFetcher>, settings: &EmailSettings) -> Result<()> {
    let progress = RunProgress::start("Generating operations report");
    let outcome = mailer::smtp_transport(settings).and_then(|transport| job.run(&transport, settings));
    match outcome {
        Ok(summary) => {
            progress.complete(&summary);
            if cli.json {
                ui::print_summary(&summary, Stream::Stdout)?;
            }
            Ok(())
        }
        Err(err) => {
            progress.fail(&err);
            Err(err.into())
        }
    }
}

fn preview_report(cli: &Cli, job: &ReportJob<SqliteFetcher>, output: Option<&Path>) -> Result<()> {
    let progress = RunProgress::start("Rendering operations report");
    let (report, summary) = match job.preview() {
        Ok(done) => done,
        Err(err) => {
            progress.fail(&err);
            return Err(err.into());
        }
    };
    progress.complete(&summary);

    // With HTML on stdout the JSON summary moves to stderr.
    let summary_stream = match output {
        Some(path) => {
            std::fs::write(path, &report.html)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Stream::Stdout
        }
        None => {
            Term::stdout()
                .write_str(&report.html)
                .context("failed to write report to stdout")?;
            Stream::Stderr
        }
    };
    if cli.json {
        ui::print_summary(&summary, summary_stream)?;
    }
    Ok(())
}
