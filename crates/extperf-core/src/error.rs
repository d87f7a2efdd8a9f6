//! Error types for extperf-core

use thiserror::Error;

/// Result type alias using extperf-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for extperf
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid run or file configuration
    #[error("{message}")]
    InvalidConfig { message: String },

    /// Extension qualifier could not be split into name and version
    #[error("Invalid extension qualifier '{qualifier}': expected \"name\": \"version\"")]
    InvalidQualifier { qualifier: String },

    /// A package directory has no readable package.json
    #[error("Missing manifest in package directory {path}: {source}")]
    MissingManifest {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A manifest is valid JSON but not shaped like a package.json
    #[error("Malformed manifest {path}: {message}")]
    ManifestFormat { path: String, message: String },

    /// External command could not be started
    #[error("Failed to start '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// External command exited unsuccessfully
    #[error("Command '{command}' failed with {status}")]
    CommandFailed { command: String, status: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid qualifier error
    pub fn invalid_qualifier(qualifier: impl Into<String>) -> Self {
        Self::InvalidQualifier {
            qualifier: qualifier.into(),
        }
    }

    /// Create a malformed manifest error
    pub fn manifest_format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ManifestFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a command failure error
    pub fn command_failed(command: impl Into<String>, status: impl ToString) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_displays_message_verbatim() {
        let err = Error::invalid_config("--runs must be at least 2");
        assert_eq!(err.to_string(), "--runs must be at least 2");
    }

    #[test]
    fn test_command_failed_display() {
        let err = Error::command_failed("jlpm run build", "exit status: 1");
        assert_eq!(
            err.to_string(),
            "Command 'jlpm run build' failed with exit status: 1"
        );
    }
}
