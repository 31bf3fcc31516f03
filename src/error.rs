//! Error types for `trafficlight`
//!
//! The signal core has almost no failure modes: a channel can be closed or a
//! bounded wait can time out, and starting a controller can be rejected or
//! fail to spawn its timing thread. Everything else here belongs to the
//! driver (configuration loading and process exit codes).

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `trafficlight` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Controller error (rejected start, thread spawn failure)
    pub const CONTROLLER_ERROR: i32 = 5;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `trafficlight` operations.
///
/// Aggregates the domain errors and maps each to a process exit code.
#[derive(Debug, Error)]
pub enum TrafficLightError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Signal controller lifecycle error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Phase channel error
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrafficLightError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Controller(_) => ExitCode::CONTROLLER_ERROR,
            Self::Channel(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Channel Errors
// ============================================================================

/// Errors returned by [`PhaseChannel`](crate::phase::PhaseChannel) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel was closed and no pending values remain.
    #[error("phase channel closed")]
    Closed,

    /// No value arrived before the wait deadline.
    #[error("timed out waiting for a phase event")]
    Timeout,
}

// ============================================================================
// Controller Errors
// ============================================================================

/// Lifecycle errors for [`SignalController`](crate::phase::SignalController).
#[derive(Debug, Error)]
pub enum ControllerError {
    /// `start()` was called while the timing loop is already running.
    #[error("signal controller is already running")]
    AlreadyRunning,

    /// `start()` was called after the controller was shut down.
    #[error("signal controller has been shut down")]
    Stopped,

    /// The operating system refused to create the timing thread.
    #[error("failed to spawn timing thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit
    #[error("config file {path} is {size} bytes, limit is {limit}")]
    FileTooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        limit: u64,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}
