//! Configuration for a report run, loaded from `rpa-report.toml`.
//!
//! [`ReportConfig`] holds the static settings (SMTP relay, failure window,
//! named constants). Values missing from the file fall back to defaults and
//! `RPA_REPORT_*` / `RPA_CONSTANT_*` environment variables take precedence over
//! the file. [`JobArguments`] is the per-run JSON handed over by the scheduler.

use lettre::message::Mailbox;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ReportError;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "rpa-report.toml";

/// Constant holding the driver-level database connection string.
pub const DB_CONNECTION_STRING: &str = "DbConnectionString";

const CONSTANT_ENV_PREFIX: &str = "RPA_CONSTANT_";

/// Static configuration for the report job.
#[derive(Clone, Deserialize)]
pub struct ReportConfig {
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP submission port; STARTTLS is negotiated on it.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Trailing window, in days, for the failed-processes section.
    #[serde(default = "default_failure_window_days")]
    pub failure_window_days: u32,

    /// Named constants normally provided by the orchestration layer.
    #[serde(default)]
    pub constants: HashMap<String, String>,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_failure_window_days() -> u32 {
    7
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            failure_window_days: default_failure_window_days(),
            constants: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for ReportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "***"))
            .field("failure_window_days", &self.failure_window_days)
            .field("constants", &self.constants.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReportConfig {
    /// Loads the configuration and applies environment overrides.
    ///
    /// An explicit `path` must exist; without one, `rpa-report.toml` in the
    /// current directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ReportError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ReportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str::<ReportConfig>(&contents)?)
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ReportError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "RPA_REPORT_SMTP_HOST" => self.smtp_host = value,
                "RPA_REPORT_SMTP_PORT" => {
                    self.smtp_port = value.parse().map_err(|_| {
                        ReportError::Configuration(format!(
                            "RPA_REPORT_SMTP_PORT is not a valid port: {value}"
                        ))
                    })?;
                }
                "RPA_REPORT_SMTP_USERNAME" => self.smtp_username = Some(value),
                "RPA_REPORT_SMTP_PASSWORD" => self.smtp_password = Some(value),
                _ => {
                    if let Some(name) = key.strip_prefix(CONSTANT_ENV_PREFIX)
                        && !name.is_empty()
                    {
                        self.constants.insert(name.to_string(), value);
                    }
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ReportError> {
        if self.smtp_host.trim().is_empty() {
            return Err(ReportError::Configuration("smtp_host must not be empty".into()));
        }
        if self.failure_window_days == 0 {
            return Err(ReportError::Configuration(
                "failure_window_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolves a named constant, e.g. [`DB_CONNECTION_STRING`].
    pub fn constant(&self, name: &str) -> Result<&str, ReportError> {
        self.constants
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ReportError::Configuration(format!("constant `{name}` is not defined")))
    }

    fn credentials(&self) -> Option<SmtpCredentials> {
        match (&self.smtp_username, &self.smtp_password) {
            (Some(username), Some(password)) => Some(SmtpCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Arguments supplied by the scheduler as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobArguments {
    #[serde(rename = "fromEmail")]
    pub from_email: String,
    #[serde(rename = "toEmail")]
    pub to_email: String,
}

impl JobArguments {
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        let args: JobArguments = serde_json::from_str(raw)
            .map_err(|e| ReportError::Configuration(format!("invalid job arguments: {e}")))?;
        if args.from_email.trim().is_empty() {
            return Err(ReportError::Configuration("fromEmail must not be empty".into()));
        }
        if args.to_email.trim().is_empty() {
            return Err(ReportError::Configuration("toEmail must not be empty".into()));
        }
        for (field, raw) in [("fromEmail", &args.from_email), ("toEmail", &args.to_email)] {
            raw.parse::<Mailbox>().map_err(|e| {
                ReportError::Configuration(format!("invalid {field} address {raw:?}: {e}"))
            })?;
        }
        Ok(args)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the mailer needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub from_email: String,
    pub to_email: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub credentials: Option<SmtpCredentials>,
}

impl EmailSettings {
    pub fn new(args: &JobArguments, config: &ReportConfig) -> Self {
        Self {
            from_email: args.from_email.clone(),
            to_email: args.to_email.clone(),
            smtp_server: config.smtp_host.clone(),
            smtp_port: config.smtp_port,
            credentials: config.credentials(),
        }
    }
}
