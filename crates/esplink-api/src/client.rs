// ── Protocol client contract ──
//
// The seam between `esplink-core` and whatever speaks the wire protocol.
// Events flow over an unbounded channel so the consumer never applies
// backpressure to the transport.

use tokio::sync::mpsc;

use crate::error::Error;
use crate::event::ProtocolEvent;

/// Receiving half of a client's event source.
pub type EventStream = mpsc::UnboundedReceiver<ProtocolEvent>;

/// Sending half of a client's event source.
pub type EventSink = mpsc::UnboundedSender<ProtocolEvent>;

/// A connection to exactly one device.
///
/// `connect()` may fail synchronously (no runtime, already running). Once it
/// returns the event stream, every later failure arrives as
/// [`ProtocolEvent::Error`] and the client is responsible for reconnecting.
pub trait ProtocolClient: Send {
    /// Start connecting and return the event source.
    fn connect(&mut self) -> Result<EventStream, Error>;

    /// Stop the connection and any reconnect timer. Safe to call repeatedly.
    fn disconnect(&mut self);
}

impl<C: ProtocolClient + ?Sized> ProtocolClient for Box<C> {
    fn connect(&mut self) -> Result<EventStream, Error> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }
}
