use thiserror::Error;

/// Top-level error type for the `esplink-api` crate.
///
/// Display strings double as the message text carried by
/// [`ProtocolEvent::Error`](crate::ProtocolEvent::Error), so they keep the
/// wording hosts already match on (`ECONNRESET`, `TIMEOUT`, ...).
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection setup ────────────────────────────────────────────
    /// The transport could not be opened (DNS failure, refused, unreachable).
    #[error("connect failed: {0}")]
    Connect(String),

    /// `connect()` was called outside of a tokio runtime.
    #[error("no async runtime available to drive the connection")]
    NoRuntime,

    /// `connect()` was called on a client that is already running.
    #[error("client is already connected")]
    AlreadyConnected,

    // ── Session ─────────────────────────────────────────────────────
    /// A keep-alive ping or handshake step did not complete in time.
    #[error("TIMEOUT: no response from device within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Raw transport failure reported by the session, message kept verbatim.
    #[error("{0}")]
    Transport(String),

    // ── Replay scripts ──────────────────────────────────────────────
    /// A recorded session line could not be parsed.
    #[error("invalid script record on line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if retrying the connection might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Timeout { .. } | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_keeps_marker() {
        let err = Error::Timeout { timeout_secs: 15 };
        assert!(err.to_string().contains("TIMEOUT"));
    }

    #[test]
    fn transport_message_is_verbatim() {
        let err = Error::Transport("read ECONNRESET".into());
        assert_eq!(err.to_string(), "read ECONNRESET");
        assert!(err.is_transient());
    }

    #[test]
    fn setup_failures_are_not_transient() {
        assert!(!Error::NoRuntime.is_transient());
        assert!(!Error::AlreadyConnected.is_transient());
    }
}
