//! Error types for the outreach pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Startup-fatal configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not configured. Set {1} environment variable or configure it in the config file")]
    MissingCredential(&'static str, &'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Failures reading or rewriting the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger is missing required column \"{0}\"")]
    MissingColumn(&'static str),
}

/// Placeholder substitution failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("Unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),
}

/// Reasons a single message could not be built
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Invalid content type: {0}")]
    ContentType(String),

    #[error("Message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),
}

/// Top-level error surfaced by the binary
#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Could not install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_messages() {
        let err = LedgerError::NotFound(PathBuf::from("data/sponsors.csv"));
        assert_eq!(err.to_string(), "Ledger file not found: data/sponsors.csv");

        let err = ConfigError::Io {
            path: PathBuf::from("config/config.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "IO error reading config/config.json: denied");
    }
}
