// ── Connection state machine ──
//
// Last-write-wins status field. Every applied transition is written and
// broadcast, including writes that leave the value unchanged.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tokio::sync::watch;
use tracing::debug;

use crate::notify::Outputs;

/// Host-visible connection status.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Inputs that move the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Transport link established; discovery begins.
    TransportConnected,
    /// Handshake and entity discovery completed.
    Initialized,
    /// Transport link lost, from any state.
    TransportDisconnected,
    /// Transport reported an error, from any state.
    TransportError,
}

impl Transition {
    /// Whether the transition is legal from `from`.
    pub fn allowed_from(self, from: ConnectionStatus) -> bool {
        match self {
            Self::Initialized => from == ConnectionStatus::Connecting,
            Self::TransportConnected | Self::TransportDisconnected | Self::TransportError => true,
        }
    }

    /// Status reached by applying this transition.
    pub fn target(self) -> ConnectionStatus {
        match self {
            Self::TransportConnected => ConnectionStatus::Connecting,
            Self::Initialized => ConnectionStatus::Connected,
            Self::TransportDisconnected => ConnectionStatus::Disconnected,
            Self::TransportError => ConnectionStatus::Error,
        }
    }
}

/// Owns the status field and publishes every write.
pub struct ConnectionStateMachine {
    current: watch::Sender<ConnectionStatus>,
    outputs: Outputs,
}

impl ConnectionStateMachine {
    pub fn new(outputs: Outputs) -> Self {
        let (current, _) = watch::channel(ConnectionStatus::Disconnected);
        Self { current, outputs }
    }

    /// Apply `transition`. Returns the new status, or `None` if the
    /// transition is not allowed from the current state.
    pub fn apply(&self, transition: Transition) -> Option<ConnectionStatus> {
        let from = self.current();
        if !transition.allowed_from(from) {
            debug!(?transition, %from, "transition ignored");
            return None;
        }

        let to = transition.target();
        // `send_replace` writes even with zero receivers and always notifies.
        self.current.send_replace(to);
        self.outputs.publish_status(to);
        debug!(%from, %to, "connection status");
        Some(to)
    }

    pub fn current(&self) -> ConnectionStatus {
        *self.current.borrow()
    }

    /// Watch the status field. Sees the latest value, not every write.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.current.subscribe()
    }
}
