//! Configuration loading.
//!
//! Settings come from an optional JSON file, then environment variables
//! override the file. The SMTP user and password are required; everything
//! else has a default.
//!
//! ```json
//! {
//!   "smtp": { "host": "smtp.gmail.com", "port": 587, "security": "starttls",
//!             "user": "team@example.com", "password": "app-password",
//!             "sender_name": "RoboVITics" },
//!   "pacing": { "min_delay_secs": 5, "max_delay_secs": 13,
//!               "batch_size": 40, "cooldown_secs": 2100 },
//!   "campaign": { "cc": "robovitics@vit.ac.in" },
//!   "ledger": "sponsors.csv",
//!   "templates": "email_templates"
//! }
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::outreach::{Campaign, ConfigError, PacingConfig, Security, Sender, SmtpSettings};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";
pub const DEFAULT_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_PORT: u16 = 587;
pub const DEFAULT_SENDER_NAME: &str = "RoboVITics";
pub const DEFAULT_LEDGER_PATH: &str = "sponsors.csv";
pub const DEFAULT_TEMPLATE_DIR: &str = "email_templates";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_USER: &str = "SMTP_USER";
pub const ENV_PASSWORD: &str = "SMTP_PASSWORD";
pub const ENV_SENDER_NAME: &str = "SENDER_NAME";
pub const ENV_HOST: &str = "SMTP_HOST";
pub const ENV_PORT: &str = "SMTP_PORT";
pub const ENV_SECURITY: &str = "SMTP_SECURITY";

/// `smtp` section as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub security: Option<Security>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sender_name: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// The config file, every field optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub smtp: SmtpSection,
    pub pacing: PacingConfig,
    pub campaign: Campaign,
    pub ledger: Option<PathBuf>,
    pub templates: Option<PathBuf>,
}

impl FileConfig {
    /// Read a config file; a missing file yields the defaults
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_owned(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Config {
    pub smtp: SmtpSettings,
    pub sender_name: String,
    pub pacing: PacingConfig,
    pub campaign: Campaign,
    pub ledger: PathBuf,
    pub templates: PathBuf,
}

impl Config {
    /// Load `path` and apply overrides from the process environment
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::resolve(FileConfig::read(path)?, |key| env::var(key).ok())
    }

    /// Merge file settings with environment lookups; `env` wins when it
    /// returns a non-empty value.
    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let FileConfig {
            smtp,
            pacing,
            campaign,
            ledger,
            templates,
        } = file;

        let user = lookup(ENV_USER)
            .or(smtp.user)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("SMTP user", ENV_USER))?;
        let password = lookup(ENV_PASSWORD)
            .or(smtp.password)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingCredential("SMTP password", ENV_PASSWORD))?;
        let sender_name = lookup(ENV_SENDER_NAME)
            .or(smtp.sender_name)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_owned());

        let host = lookup(ENV_HOST)
            .or(smtp.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = match lookup(ENV_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: ENV_PORT,
                reason: format!("{raw:?}: {e}"),
            })?,
            None => smtp.port.unwrap_or(DEFAULT_PORT),
        };
        let security = match lookup(ENV_SECURITY) {
            Some(raw) => raw.parse::<Security>().map_err(|reason| ConfigError::Invalid {
                key: ENV_SECURITY,
                reason,
            })?,
            None => smtp.security.unwrap_or_default(),
        };

        pacing.validate()?;

        Ok(Self {
            smtp: SmtpSettings {
                host,
                port,
                security,
                user: user.trim().to_owned(),
                password,
                timeout: Duration::from_secs(smtp.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            },
            sender_name,
            pacing,
            campaign,
            ledger: ledger.unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH)),
            templates: templates.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR)),
        })
    }

    /// The identity messages are sent from
    pub fn sender(&self) -> Sender {
        Sender {
            name: self.sender_name.clone(),
            address: self.smtp.user.clone(),
        }
    }
}
