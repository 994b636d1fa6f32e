//! Builds the report email and submits it over SMTP with STARTTLS.

use lettre::message::header::{HeaderName, HeaderValue};
use lettre::message::{Mailbox, SinglePart, header::Header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::config::EmailSettings;
use crate::error::ReportError;

pub const SUBJECT: &str = "RPA - Operations report";
pub const ALERT_SUFFIX: &str = " - ⚠️ Warning. Action required ⚠️";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Declares a free-form text header for the priority flags lettre has no
/// typed header for.
macro_rules! text_header {
    ($ty:ident, $name:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        struct $ty(String);

        impl Header for $ty {
            fn name() -> HeaderName {
                HeaderName::new_from_ascii_str($name)
            }

            fn parse(s: &str) -> Result<Self, BoxError> {
                Ok(Self(s.to_string()))
            }

            fn display(&self) -> HeaderValue {
                HeaderValue::new(Self::name(), self.0.clone())
            }
        }
    };
}

text_header!(XPriority, "X-Priority");
text_header!(XMsMailPriority, "X-MSMail-Priority");
text_header!(Importance, "Importance");

pub fn subject_line(alert: bool) -> String {
    if alert {
        format!("{SUBJECT}{ALERT_SUFFIX}")
    } else {
        SUBJECT.to_string()
    }
}

fn mailbox(raw: &str, field: &str) -> Result<Mailbox, ReportError> {
    raw.parse()
        .map_err(|e| ReportError::Configuration(format!("invalid {field} address {raw:?}: {e}")))
}

/// Builds the report message. The HTML document is the only MIME part; the
/// priority headers are present only when `alert` is set.
pub fn build_message(
    html: &str,
    alert: bool,
    settings: &EmailSettings,
) -> Result<Message, ReportError> {
    let mut builder = Message::builder()
        .from(mailbox(&settings.from_email, "fromEmail")?)
        .to(mailbox(&settings.to_email, "toEmail")?)
        .subject(subject_line(alert));

    if alert {
        builder = builder
            .header(XPriority("1".into()))
            .header(XMsMailPriority("High".into()))
            .header(Importance("High".into()));
    }

    builder
        .singlepart(SinglePart::html(html.to_string()))
        .map_err(|e| ReportError::Configuration(format!("cannot build email: {e}")))
}

/// SMTP transport for the configured relay. STARTTLS is required; a relay
/// that does not offer it fails the submission. Built without a pool, so
/// each submission opens its own session and closes it when done.
pub fn smtp_transport(settings: &EmailSettings) -> Result<SmtpTransport, ReportError> {
    let mut builder = SmtpTransport::starttls_relay(&settings.smtp_server)
        .map_err(|e| ReportError::MailTransport(format!("SMTP relay: {e}")))?
        .port(settings.smtp_port);

    if let Some(creds) = &settings.credentials {
        builder = builder.credentials(Credentials::new(
            creds.username.clone(),
            creds.password.clone(),
        ));
    }

    Ok(builder.build())
}

/// Submits `message` once. No retry: a failure is returned to the caller.
pub fn submit<T>(transport: &T, message: &Message) -> Result<(), ReportError>
where
    T: Transport,
    T::Error: std::fmt::Display,
{
    transport
        .send(message)
        .map(|_| ())
        .map_err(|e| ReportError::MailTransport(format!("SMTP send: {e}")))
}

/// Builds and sends the report through `transport`.
pub fn send_with<T>(
    transport: &T,
    html: &str,
    alert: bool,
    settings: &EmailSettings,
) -> Result<(), ReportError>
where
    T: Transport,
    T::Error: std::fmt::Display,
{
    let message = build_message(html, alert, settings)?;
    debug!(
        relay = %settings.smtp_server,
        port = settings.smtp_port,
        alert,
        "submitting report email"
    );
    submit(transport, &message)?;
    info!("Email sent to {}", settings.to_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettre::transport::stub::StubTransport;

    fn settings() -> EmailSettings {
        EmailSettings {
            from_email: "robot@example.org".into(),
            to_email: "ops@example.org".into(),
            smtp_server: "smtp.example.org".into(),
            smtp_port: 587,
            credentials: None,
        }
    }

    #[test]
    fn subject_without_alert_is_plain() {
        assert_eq!(subject_line(false), "RPA - Operations report");
    }

    #[test]
    fn subject_with_alert_has_warning_suffix() {
        let subject = subject_line(true);
        assert!(subject.starts_with(SUBJECT));
        assert!(subject.ends_with(ALERT_SUFFIX));
    }

    #[test]
    fn alert_message_carries_priority_headers() {
        let message = build_message("<p>x</p>", true, &settings()).unwrap();
        let headers = message.headers();
        assert_eq!(headers.get_raw("X-Priority"), Some("1"));
        assert_eq!(headers.get_raw("X-MSMail-Priority"), Some("High"));
        assert_eq!(headers.get_raw("Importance"), Some("High"));
        assert_eq!(headers.get_raw("Subject"), Some(subject_line(true).as_str()));
    }

    #[test]
    fn normal_message_has_no_priority_headers() {
        let message = build_message("<p>x</p>", false, &settings()).unwrap();
        let headers = message.headers();
        assert_eq!(headers.get_raw("X-Priority"), None);
        assert_eq!(headers.get_raw("X-MSMail-Priority"), None);
        assert_eq!(headers.get_raw("Importance"), None);
        assert_eq!(headers.get_raw("Subject"), Some(SUBJECT));
    }

    #[test]
    fn body_is_single_html_part() {
        let message = build_message("<p>report</p>", false, &settings()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!raw.contains("multipart"));
        assert!(raw.contains("<p>report</p>"));
    }

    #[test]
    fn invalid_address_is_configuration_error() {
        let mut bad = settings();
        bad.to_email = "not an address".into();
        let err = build_message("<p>x</p>", false, &bad).unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
    }

    #[test]
    fn send_with_submits_exactly_once() {
        let transport = StubTransport::new_ok();
        send_with(&transport, "<p>x</p>", true, &settings()).unwrap();
        let sent = transport.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.to().len(), 1);
        assert!(sent[0].1.contains("X-Priority: 1"));
    }

    #[test]
    fn submission_failure_is_mail_transport_error() {
        let transport = StubTransport::new_error();
        let err = send_with(&transport, "<p>x</p>", false, &settings()).unwrap_err();
        assert!(matches!(err, ReportError::MailTransport(_)));
    }

    #[test]
    fn smtp_transport_builds_without_connecting() {
        assert!(smtp_transport(&settings()).is_ok());
    }
}
