//! Command-line interface, built on clap.
//!
//! [`Cli`] carries the subcommands ([`Command`]: run, preview) and the
//! global flags (--config, --arguments, --arguments-file, --verbose, --json).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::ReportError;

/// RPA operations report: checks trigger health and mails the result.
#[derive(Debug, Parser)]
#[command(name = "rpa-report", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file (default: ./rpa-report.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Job arguments as a JSON object with `fromEmail` and `toEmail`.
    #[arg(long, global = true, env = "RPA_PROCESS_ARGUMENTS")]
    pub arguments: Option<String>,

    /// Read the job arguments JSON from a file instead.
    #[arg(long, global = true)]
    pub arguments_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Print the run summary as JSON when done.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query, render and email the operations report.
    Run,

    /// Query and render the report without sending it.
    Preview {
        /// Write the HTML here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Raw job arguments JSON. `--arguments-file` wins over `--arguments`.
    pub fn job_arguments(&self) -> Result<String, ReportError> {
        if let Some(path) = &self.arguments_file {
            return std::fs::read_to_string(path).map_err(|e| {
                ReportError::Configuration(format!(
                    "cannot read job arguments from {}: {e}",
                    path.display()
                ))
            });
        }
        self.arguments.clone().ok_or_else(|| {
            ReportError::Configuration(
                "no job arguments: pass --arguments, --arguments-file or set RPA_PROCESS_ARGUMENTS"
                    .into(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from([
            "rpa-report",
            "run",
            "--arguments",
            r#"{"fromEmail":"a@example.org","toEmail":"b@example.org"}"#,
        ]);
        assert!(matches!(cli.command, Command::Run));
        assert!(cli.job_arguments().unwrap().contains("fromEmail"));
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "rpa-report",
            "--config",
            "/etc/rpa-report.toml",
            "--verbose",
            "--json",
            "preview",
        ]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/rpa-report.toml")));
    }

    #[test]
    fn cli_parses_preview_output() {
        let cli = Cli::parse_from(["rpa-report", "preview", "-o", "report.html"]);
        match cli.command {
            Command::Preview { output } => {
                assert_eq!(output, Some(PathBuf::from("report.html")));
            }
            _ => panic!("expected Preview command"),
        }
    }

    #[test]
    fn arguments_file_takes_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fromEmail":"file@example.org","toEmail":"b@example.org"}}"#).unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from([
            "rpa-report",
            "run",
            "--arguments",
            "{}",
            "--arguments-file",
            path.as_str(),
        ]);
        assert!(cli.job_arguments().unwrap().contains("file@example.org"));
    }

    #[test]
    fn unreadable_arguments_file_is_configuration_error() {
        let cli = Cli::parse_from([
            "rpa-report",
            "run",
            "--arguments-file",
            "/tmp/definitely_missing_rpa_args.json",
        ]);
        assert!(matches!(
            cli.job_arguments(),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
