//! CLI error type and exit codes.

use std::fmt;

use plantwatch::config::ConfigError;
use plantwatch::logging::LoggingError;
use plantwatch::service::ServiceError;

/// Errors surfaced to the user by a command.
#[derive(Debug)]
pub enum CliError {
    /// Reading, validating or writing configuration failed.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// The async runtime could not be started.
    Runtime(String),
    /// The catalogue client could not be created.
    Service(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Logging(_) | CliError::Runtime(_) | CliError::Service(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Service(msg) => write!(f, "Service error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 2);
        assert_eq!(CliError::Runtime("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigError::UnknownKey("service.nope".into()).into();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown configuration key 'service.nope'"
        );
    }
}
