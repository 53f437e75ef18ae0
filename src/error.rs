//! Error types for rrsleuth
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::mi::Record;

/// All error types that can occur in rrsleuth
#[derive(Debug, Error)]
pub enum SleuthError {
    /// Writing to or reading from the debugger process failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No settling record arrived before the deadline. Partial records are kept.
    #[error("Timed out after {timeout_ms}ms waiting for '{command}' to settle ({} records received)", records.len())]
    CorrelationTimeout {
        command: String,
        timeout_ms: u64,
        records: Vec<Record>,
    },

    /// Missing or ill-typed tool arguments
    #[error("Invalid tool arguments: {0}")]
    ToolArgument(String),

    /// The backend asked for a tool that is not registered
    #[error("Unknown function: {0}")]
    UnknownTool(String),

    /// Reasoning backend call failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration could not be used
    #[error("Config error: {0}")]
    Config(String),

    /// Broken internal invariant, e.g. a tool call left unanswered in the transcript
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SleuthError {
    /// Whether the error should be fed back to the model as text rather than
    /// abort the question. Transport, backend and internal failures abort.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SleuthError::Transport(_) | SleuthError::Backend(_) | SleuthError::Internal(_)
        )
    }

    /// Records received before a correlation timeout, empty for other errors
    pub fn partial_records(&self) -> &[Record] {
        match self {
            SleuthError::CorrelationTimeout { records, .. } => records,
            _ => &[],
        }
    }
}

/// Result type alias for rrsleuth operations
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error() {
        let err = SleuthError::Transport("broken pipe".to_string());
        assert_eq!(err.to_string(), "Transport error: broken pipe");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unknown_tool_error() {
        let err = SleuthError::UnknownTool("launch_rockets".to_string());
        assert_eq!(err.to_string(), "Unknown function: launch_rockets");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_correlation_timeout_keeps_records() {
        let records = vec![Record::decode("~\"hello\\n\"").unwrap(), Record::decode("=thread-created,id=\"1\"").unwrap()];
        let err = SleuthError::CorrelationTimeout {
            command: "c".to_string(),
            timeout_ms: 500,
            records,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.partial_records().len(), 2);
        assert!(err.to_string().contains("2 records received"));
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn test_backend_error() {
        let err = SleuthError::Backend("401 unauthorized".to_string());
        assert_eq!(err.to_string(), "Backend error: 401 unauthorized");
        assert!(!err.is_recoverable());
        assert!(err.partial_records().is_empty());
    }

    #[test]
    fn test_internal_error_is_fatal() {
        let err = SleuthError::Internal("tool call c1 unanswered".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SleuthError = io_err.into();
        assert!(matches!(err, SleuthError::Io(_)));
        assert!(err.to_string().contains("file not found"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: SleuthError = json_err.into();
        assert!(matches!(err, SleuthError::Json(_)));
    }
}
