//! Message dispatch over SMTP

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;
use tracing::{error, info};

/// Outcome of a single send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    Sent,
    Failed { reason: String },
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// Something that can deliver a message.
///
/// Implementations never return errors; every failure is folded into
/// [`SendResult::Failed`].
pub trait Dispatcher {
    fn send(&self, message: &Message) -> SendResult;
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain connection upgraded with STARTTLS (port 587)
    #[default]
    StartTls,
    /// TLS from the first byte (port 465)
    Tls,
    /// No encryption; only for local relays
    None,
}

impl FromStr for Security {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Security::StartTls),
            "tls" => Ok(Security::Tls),
            "none" => Ok(Security::None),
            other => Err(format!("expected starttls, tls or none, got \"{other}\"")),
        }
    }
}

/// Connection settings for the SMTP relay
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Sends each message over its own authenticated SMTP session
#[derive(Debug, Clone)]
pub struct SmtpDispatcher {
    settings: SmtpSettings,
}

impl SmtpDispatcher {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn transport(&self) -> Result<SmtpTransport, SmtpError> {
        let SmtpSettings {
            host,
            port,
            security,
            user,
            password,
            timeout,
        } = &self.settings;

        let builder = match security {
            Security::StartTls => SmtpTransport::starttls_relay(host)?,
            Security::Tls => SmtpTransport::relay(host)?,
            Security::None => SmtpTransport::builder_dangerous(host.as_str()),
        };

        Ok(builder
            .port(*port)
            .credentials(Credentials::new(user.clone(), password.clone()))
            .timeout(Some(*timeout))
            .build())
    }
}

impl Dispatcher for SmtpDispatcher {
    fn send(&self, message: &Message) -> SendResult {
        let recipients = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        // The transport is dropped at the end of this call, closing the session
        let result = self
            .transport()
            .and_then(|transport| transport.send(message));

        match result {
            Ok(_) => {
                info!("Email sent successfully to {recipients}");
                SendResult::Sent
            }
            Err(e) => {
                error!("Failed to send email to {recipients}: {e}");
                SendResult::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            security: Security::None,
            user: "team@example.com".to_string(),
            password: "hunter2".to_string(),
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_security_from_str() {
        assert_eq!("starttls".parse::<Security>(), Ok(Security::StartTls));
        assert_eq!(" TLS ".parse::<Security>(), Ok(Security::Tls));
        assert_eq!("none".parse::<Security>(), Ok(Security::None));
        assert!("ssl".parse::<Security>().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", settings());
        assert!(debug.contains("team@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_unreachable_relay_is_a_failure() {
        let dispatcher = SmtpDispatcher::new(settings());
        let message = Message::builder()
            .from("team@example.com".parse().unwrap())
            .to("ada@acme.io".parse().unwrap())
            .subject("Hello")
            .body("Body".to_string())
            .unwrap();

        let result = dispatcher.send(&message);
        assert!(matches!(result, SendResult::Failed { .. }));
        assert!(!result.is_sent());
    }
}
