// ── Transport error classification ──
//
// Known-benign failures are recognized by substring on the error message.
// The match is case-sensitive and tried in table order; anything else is
// `Unexpected`. A structured error code from the protocol client would
// replace this once one exists.

use serde::Serialize;
use strum::{Display, IntoStaticStr};

/// Coarse class of a transport error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    HostUnreachable,
    InvalidPassword,
    ConnectionReset,
    Timeout,
    WriteAfterEnd,
    Unexpected,
}

const BENIGN: [(&str, ErrorClass); 5] = [
    ("EHOSTUNREACH", ErrorClass::HostUnreachable),
    ("Invalid password", ErrorClass::InvalidPassword),
    ("ECONNRESET", ErrorClass::ConnectionReset),
    ("TIMEOUT", ErrorClass::Timeout),
    ("write after end", ErrorClass::WriteAfterEnd),
];

impl ErrorClass {
    pub fn classify(message: &str) -> Self {
        BENIGN
            .iter()
            .find(|(needle, _)| message.contains(needle))
            .map_or(Self::Unexpected, |(_, class)| *class)
    }

    /// Benign errors update status but are not escalated to diagnostics.
    pub fn is_benign(self) -> bool {
        self != Self::Unexpected
    }
}
