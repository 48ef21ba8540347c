//! Error handling for matflow-rs
//!
//! This module defines the crate-wide error type and a Result alias.
//! Each subsystem keeps its own narrower error enum (`ConfigError`,
//! `PipelineError`, `ComputeError`) that converts into [`FlowError`].

use crate::compute::ComputeError;
use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for matflow-rs operations
#[derive(Error, Debug)]
pub enum FlowError {
    /// Errors raised while resolving or validating configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while building or running the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors reported by a device-compute backend
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) came from configuration.
    pub fn is_config(&self) -> bool {
        match self {
            FlowError::Config(_) => true,
            FlowError::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Serialization(err.to_string())
    }
}

/// Result type alias for matflow-rs operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowError::Config(ConfigError::MissingOption("brightness"));
        assert_eq!(
            err.to_string(),
            "Configuration error: missing required option: brightness"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = FlowError::Serialization("bad report".to_string());
        let with_ctx = err.with_context("Failed to print report");
        assert!(with_ctx.to_string().contains("Failed to print report"));
        assert!(with_ctx.to_string().contains("bad report"));
    }

    #[test]
    fn test_is_config_sees_through_context() {
        let err: Result<()> = Err(ConfigError::ZeroMaxInFlight).context("startup");
        assert!(err.unwrap_err().is_config());

        let io = FlowError::Io(std::io::Error::other("disk"));
        assert!(!io.is_config());
    }
}
