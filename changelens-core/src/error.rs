use std::path::PathBuf;

use serde::Serialize;

use crate::types::Side;

/// Stable classification of fatal analysis errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A touched source file has no content for a side where it must exist.
    MissingContent,
    /// The configuration could not be parsed or failed validation.
    InvalidConfig,
    /// An invariant of the engine itself was violated.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingContent => "missing_content",
            Self::InvalidConfig => "invalid_config",
            Self::Internal => "internal",
        }
    }
}

/// Top-level analysis error.
///
/// Per-file problems never surface here; they become skipped files or
/// diagnostics on the report. Only failures that make the whole run
/// meaningless abort it.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// A touched file's content is absent from the snapshot that should hold it.
    #[error("Missing {side} content for {}", path.display())]
    MissingContent {
        /// Path of the touched file.
        path: PathBuf,
        /// Snapshot lacking the content.
        side: Side,
    },

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the declaration engine outside of per-file parsing.
    #[error("Graph engine error: {0}")]
    Graph(#[from] changelens_graphs::GraphError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingContent { .. } => ErrorCode::MissingContent,
            Self::Config(_) => ErrorCode::InvalidConfig,
            Self::Graph(_) | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Errors in changelens configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, AnalysisError>`.
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let missing = AnalysisError::MissingContent {
            path: PathBuf::from("src/Foo.php"),
            side: Side::After,
        };
        assert_eq!(missing.code(), ErrorCode::MissingContent);
        assert_eq!(missing.to_string(), "Missing after content for src/Foo.php");

        let config = AnalysisError::from(ConfigError::Invalid("bad".into()));
        assert_eq!(config.code(), ErrorCode::InvalidConfig);
        assert_eq!(config.code().as_str(), "invalid_config");

        assert_eq!(AnalysisError::Internal("x".into()).code(), ErrorCode::Internal);
    }
}
