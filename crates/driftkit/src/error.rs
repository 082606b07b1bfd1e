//! Error types for drift detection.
//!
//! Errors are categorized so the reconciliation loop knows which failures
//! may be absorbed by a retry and which ones end the loop. Each variant
//! carries only the fields needed to explain what went wrong.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of drift-detection errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The provider call itself failed (transient, retryable)
    Upstream,
    /// The provider answered but described no instance
    NotFound,
    /// A declared source could not be read or decoded
    Source,
    /// Nothing in the declared sources matched the live instance
    NoMatch,
    /// The cycle was aborted by cancellation or a timeout
    Aborted,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Upstream => "Cloud provider call failed",
            Self::NotFound => "Instance not found",
            Self::Source => "Declared state unavailable",
            Self::NoMatch => "No matching declared resource",
            Self::Aborted => "Drift check aborted",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Upstream => "Check credentials, region and endpoint, then try again",
            Self::NotFound => "Verify the instance id or that the instance is running",
            Self::Source => "Check the state and config paths and their contents",
            Self::NoMatch => "Make sure the state file contains the expected resource type",
            Self::Aborted => "No action needed if a shutdown was requested",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while detecting drift.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider call failed (CLI missing, non-zero exit, bad response)
    #[error("provider call failed: {message}")]
    Upstream {
        /// Detailed error message from the failed call
        message: String,
    },

    /// The provider returned zero instances
    #[error("no instances found{}", .instance_id.as_deref().map(|id| format!(" for {id}")).unwrap_or_default())]
    NotFound {
        /// Instance id that was requested, if any
        instance_id: Option<String>,
    },

    /// The provider described an instance that cannot be normalized
    #[error("malformed instance description: {reason}")]
    MalformedInstance {
        /// What was missing or invalid
        reason: String,
    },

    /// The Terraform config file could not be read
    #[error("failed to read Terraform config {}: {source}", .path.display())]
    ConfigUnreadable {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The Terraform state file could not be read
    #[error("failed to read Terraform state {}: {source}", .path.display())]
    SnapshotUnreadable {
        /// Path of the state file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The Terraform state file is not valid state JSON
    #[error("failed to parse Terraform state {}: {source}", .path.display())]
    SnapshotMalformed {
        /// Path of the state file
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// No declared instance of the resource type exists
    #[error("no matching Terraform {resource_type} found for AWS instance {instance_id}")]
    NoMatchingResource {
        /// Resource type that was searched for
        resource_type: String,
        /// Live instance the comparison was for
        instance_id: String,
    },

    /// The cycle was cancelled while in flight
    #[error("drift check cancelled")]
    Cancelled,

    /// The comparison phase did not finish in time
    #[error("drift comparison timed out after {}s", .after.as_secs())]
    ComparisonTimeout {
        /// Configured timeout
        after: Duration,
    },

    /// A comparison task panicked or was aborted
    #[error("comparison task failed: {reason}")]
    TaskFailed {
        /// Join error description
        reason: String,
    },
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Upstream { .. } => ErrorCategory::Upstream,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::ConfigUnreadable { .. }
            | Error::SnapshotUnreadable { .. }
            | Error::SnapshotMalformed { .. } => ErrorCategory::Source,
            Error::NoMatchingResource { .. } => ErrorCategory::NoMatch,
            Error::Cancelled | Error::ComparisonTimeout { .. } => ErrorCategory::Aborted,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this error means the cycle was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Shorthand for an upstream failure.
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream {
            message: message.into(),
        }
    }
}

/// Result type for drift-detection operations.
pub type Result<T> = std::result::Result<T, Error>;
