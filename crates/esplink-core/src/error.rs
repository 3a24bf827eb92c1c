// ── Core error types ──
//
// User-facing errors from esplink-core. Only gateway startup can fail: once
// the event loop runs, every failure becomes a status notification instead.
// The `From<esplink_api::Error>` impl translates client-level errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {host}:{port}: {reason}")]
    ConnectFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("No async runtime available: the gateway must be started inside a tokio runtime")]
    NoRuntime,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Protocol errors (wrapped, not exposed raw) ───────────────────
    #[error("Protocol client error: {message}")]
    Protocol { message: String },
}

impl CoreError {
    /// Attach the target address to a client error raised by `connect()`.
    pub(crate) fn connect(host: &str, port: u16, err: esplink_api::Error) -> Self {
        match err {
            esplink_api::Error::NoRuntime => Self::NoRuntime,
            other => Self::ConnectFailed {
                host: host.to_string(),
                port,
                reason: other.to_string(),
            },
        }
    }
}

// ── Conversion from client-layer errors ──────────────────────────────

impl From<esplink_api::Error> for CoreError {
    fn from(err: esplink_api::Error) -> Self {
        match err {
            esplink_api::Error::NoRuntime => CoreError::NoRuntime,
            esplink_api::Error::Script { line, message } => CoreError::Config {
                message: format!("replay script line {line}: {message}"),
            },
            esplink_api::Error::Io(e) => CoreError::Config {
                message: e.to_string(),
            },
            other => CoreError::Protocol {
                message: other.to_string(),
            },
        }
    }
}
