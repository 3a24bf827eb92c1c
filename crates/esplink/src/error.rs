//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use esplink_config::ConfigError;
use esplink_core::CoreError;

/// Process exit codes. Usage errors exit with 2 from clap itself.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to device at {address}: {reason}")]
    #[diagnostic(
        code(esplink::connection_failed),
        help(
            "Check that the device is powered, on the network, and has the native API enabled.\n\
             Address: {address}"
        )
    )]
    ConnectionFailed { address: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No device address configured for profile '{profile}'")]
    #[diagnostic(
        code(esplink::no_target),
        help(
            "Pass --host and --port, or add host/port to the profile.\n\
             Config file: {path}"
        )
    )]
    NoTarget { profile: String, path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(esplink::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Invalid replay script: {message}")]
    #[diagnostic(
        code(esplink::script),
        help("Each line must be one JSON protocol event tagged with an \"event\" field.")
    )]
    Script { message: String },

    #[error(transparent)]
    #[diagnostic(code(esplink::config))]
    Config(#[from] ConfigError),

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(esplink::internal))]
    Internal { message: String },

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(esplink::serialization))]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to render config: {0}")]
    #[diagnostic(code(esplink::serialization))]
    Toml(#[from] toml::ser::Error),

    #[error(transparent)]
    #[diagnostic(code(esplink::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoTarget { .. }
            | Self::ProfileNotFound { .. }
            | Self::Script { .. }
            | Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectFailed { host, port, reason } => CliError::ConnectionFailed {
                address: format!("{host}:{port}"),
                reason,
            },
            CoreError::Config { message } => CliError::Script { message },
            other @ (CoreError::NoRuntime | CoreError::Protocol { .. }) => CliError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<esplink_api::Error> for CliError {
    fn from(err: esplink_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
