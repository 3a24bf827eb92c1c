// ── Notification fan-out ──
//
// One unbounded publish/subscribe channel per notification type, plus a
// combined channel carrying every notification in publish order. Every
// subscriber owns its own unbounded receiver, so a slow host never blocks
// the event loop and there is no limit on how many subscribers attach.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::model::{BeaconNotification, Diagnostic, StateNotification};
use crate::state::ConnectionStatus;

/// Unbounded, uncapped fan-out channel.
///
/// Cheaply cloneable; clones publish to the same subscriber set.
pub struct Notifier<T> {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<T>>>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber. It sees every value published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `value` to every live subscriber, pruning dropped ones.
    /// Returns the number of subscribers reached.
    pub fn publish(&self, value: T) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        subscribers.len()
    }

    /// Number of attached subscribers, including ones dropped since the
    /// last publish.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<T>>> {
        // A panic while holding the lock cannot leave the Vec inconsistent.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Outputs ──────────────────────────────────────────────────────────

/// Any notification, as delivered on the combined channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(ConnectionStatus),
    State(StateNotification),
    Ble(BeaconNotification),
    Diagnostic(Diagnostic),
}

/// The gateway's notification channels, shared by router and facade.
///
/// Publish through the `publish_*` methods so the combined channel sees
/// every notification in the same order as the typed ones.
#[derive(Clone, Default)]
pub struct Outputs {
    pub status: Notifier<ConnectionStatus>,
    pub state: Notifier<StateNotification>,
    pub ble: Notifier<BeaconNotification>,
    pub diagnostics: Notifier<Diagnostic>,
    pub all: Notifier<Notification>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_status(&self, status: ConnectionStatus) {
        self.status.publish(status);
        self.all.publish(Notification::Status(status));
    }

    pub fn publish_state(&self, note: StateNotification) {
        self.state.publish(note.clone());
        self.all.publish(Notification::State(note));
    }

    pub fn publish_ble(&self, note: BeaconNotification) {
        self.ble.publish(note.clone());
        self.all.publish(Notification::Ble(note));
    }

    pub fn publish_diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics.publish(diagnostic.clone());
        self.all.publish(Notification::Diagnostic(diagnostic));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_every_value_in_order() {
        let notifier: Notifier<u32> = Notifier::new();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        assert_eq!(notifier.publish(1), 2);
        assert_eq!(notifier.publish(2), 2);

        assert_eq!(a.try_recv().unwrap(), 1);
        assert_eq!(a.try_recv().unwrap(), 2);
        assert_eq!(b.try_recv().unwrap(), 1);
        assert_eq!(b.try_recv().unwrap(), 2);
    }

    #[test]
    fn late_subscriber_misses_earlier_values() {
        let notifier: Notifier<&str> = Notifier::new();
        notifier.publish("early");
        let mut late = notifier.subscribe();
        notifier.publish("late");

        assert_eq!(late.try_recv().unwrap(), "late");
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let notifier: Notifier<u8> = Notifier::new();
        let keep = notifier.subscribe();
        drop(notifier.subscribe());

        assert_eq!(notifier.subscriber_count(), 2);
        assert_eq!(notifier.publish(7), 1);
        assert_eq!(notifier.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let notifier: Notifier<u8> = Notifier::new();
        assert_eq!(notifier.publish(1), 0);
    }

    #[test]
    fn subscriber_count_is_not_capped() {
        let notifier: Notifier<u16> = Notifier::new();
        let receivers: Vec<_> = (0..1_000).map(|_| notifier.subscribe()).collect();
        assert_eq!(notifier.publish(9), 1_000);
        assert_eq!(receivers.len(), 1_000);
    }

    #[test]
    fn combined_channel_keeps_cross_type_order() {
        let outputs = Outputs::new();
        let mut all = outputs.all.subscribe();
        let mut status = outputs.status.subscribe();

        let note = StateNotification::new("1", esplink_api::Payload::new());
        outputs.publish_status(ConnectionStatus::Connecting);
        outputs.publish_state(note.clone());
        outputs.publish_status(ConnectionStatus::Disconnected);

        let got: Vec<_> = std::iter::from_fn(|| all.try_recv().ok()).collect();
        assert_eq!(
            got,
            vec![
                Notification::Status(ConnectionStatus::Connecting),
                Notification::State(note),
                Notification::Status(ConnectionStatus::Disconnected),
            ]
        );
        assert_eq!(status.try_recv().unwrap(), ConnectionStatus::Connecting);
    }

    #[test]
    fn clones_share_subscribers() {
        let notifier: Notifier<u8> = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.clone().publish(3);
        assert_eq!(rx.try_recv().unwrap(), 3);
    }
}
