use thiserror::Error;

/// Every way a report run can fail. None of these are retried in-process;
/// they abort the run and surface to the scheduler through the exit code.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Mail transport error: {0}")]
    MailTransport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        ReportError::Database(err.to_string())
    }
}

impl From<handlebars::TemplateError> for ReportError {
    fn from(err: handlebars::TemplateError) -> Self {
        ReportError::Render(format!("invalid template: {err}"))
    }
}

impl From<handlebars::RenderError> for ReportError {
    fn from(err: handlebars::RenderError) -> Self {
        ReportError::Render(err.to_string())
    }
}

impl ReportError {
    /// Short category label used in the terminal outcome line.
    pub fn category(&self) -> &'static str {
        match self {
            ReportError::Configuration(_) | ReportError::Toml(_) | ReportError::Json(_) => {
                "configuration"
            }
            ReportError::Database(_) => "database",
            ReportError::Render(_) => "render",
            ReportError::MailTransport(_) => "mail",
            ReportError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_error_from_rusqlite() {
        let err: ReportError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, ReportError::Database(_)));
        assert_eq!(err.category(), "database");
    }

    #[test]
    fn mail_transport_display() {
        let err = ReportError::MailTransport("connection refused".into());
        assert_eq!(err.to_string(), "Mail transport error: connection refused");
    }

    #[test]
    fn json_errors_count_as_configuration() {
        let err: ReportError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn template_errors_are_render_errors() {
        let err: ReportError = handlebars::Handlebars::new()
            .register_template_string("broken", "{{#each rows}}")
            .unwrap_err()
            .into();
        assert!(matches!(err, ReportError::Render(_)));
        assert_eq!(err.category(), "render");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReportError>();
    }
}
