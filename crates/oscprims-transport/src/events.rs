//! Inbound OSC events.
//!
//! Every decoded datagram is published through [`tokio::sync::broadcast`]
//! channels: one generic channel carrying [`OscEvent`]s, plus one channel per
//! subscribed address carrying [`AddressedMessage`]s. Delivery is
//! best-effort; a subscriber that falls more than the channel capacity
//! behind observes `RecvError::Lagged`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use oscprims_codec::{CodecError, Decoded, DecodedBundle, FlatMessage, PlainValue};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// An event published for every inbound datagram.
#[derive(Debug, Clone)]
pub enum OscEvent {
    /// A single message arrived.
    Message {
        message: FlatMessage,
        from: SocketAddr,
    },

    /// A bundle arrived.
    Bundle {
        bundle: DecodedBundle,
        from: SocketAddr,
    },

    /// A datagram failed to decode and was dropped.
    Error { error: CodecError, from: SocketAddr },
}

impl OscEvent {
    /// The address/port the datagram came from.
    pub fn sender_addr(&self) -> SocketAddr {
        match self {
            Self::Message { from, .. } | Self::Bundle { from, .. } | Self::Error { from, .. } => {
                *from
            }
        }
    }
}

/// A message delivered on an address-keyed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressedMessage {
    pub args: Vec<PlainValue>,
    pub from: SocketAddr,
}

/// Fan-out point for inbound events.
///
/// Shared between successive sessions so subscriptions survive a change of
/// remote device.
#[derive(Debug)]
pub struct EventHub {
    events: broadcast::Sender<OscEvent>,
    routes: Mutex<HashMap<String, broadcast::Sender<AddressedMessage>>>,
    capacity: usize,
}

impl EventHub {
    /// Create a hub whose channels each buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (events, _) = broadcast::channel(capacity);
        Self {
            events,
            routes: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Receive every message, bundle and decode error.
    pub fn subscribe(&self) -> broadcast::Receiver<OscEvent> {
        self.events.subscribe()
    }

    /// Receive only messages whose address equals `address` exactly.
    pub fn subscribe_address(&self, address: &str) -> broadcast::Receiver<AddressedMessage> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes
            .entry(address.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of registered address routes.
    pub fn route_count(&self) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Publish the outcome of decoding one datagram from `from`.
    pub fn dispatch(&self, from: SocketAddr, decoded: oscprims_codec::Result<Decoded>) {
        match decoded {
            Ok(Decoded::Message(message)) => self.dispatch_message(from, message),
            Ok(Decoded::Bundle(bundle)) => {
                trace!(%from, elements = bundle.elements.len(), "bundle received");
                let _ = self.events.send(OscEvent::Bundle { bundle, from });
            }
            Err(error) => {
                warn!(%from, %error, "dropping undecodable datagram");
                let _ = self.events.send(OscEvent::Error { error, from });
            }
        }
    }

    fn dispatch_message(&self, from: SocketAddr, message: FlatMessage) {
        trace!(%from, address = %message.address, args = message.args.len(), "message received");

        let route = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            let live = routes
                .get(&message.address)
                .map(|tx| (tx.receiver_count() > 0, tx.clone()));
            match live {
                Some((true, tx)) => Some(tx),
                Some((false, _)) => {
                    routes.remove(&message.address);
                    None
                }
                None => None,
            }
        };

        let addressed = route.map(|tx| {
            (
                tx,
                AddressedMessage {
                    args: message.args.clone(),
                    from,
                },
            )
        });

        let _ = self.events.send(OscEvent::Message { message, from });
        if let Some((tx, addressed)) = addressed {
            let _ = tx.send(addressed);
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}
