use std::net::SocketAddr;
use std::sync::Arc;

use oscprims_codec::{Argument, Packet};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::{resolve, SessionConfig};
use crate::error::{Result, TransportError};
use crate::events::{AddressedMessage, EventHub, OscEvent};
use crate::session::{OscSender, Session};

/// Owns the connection to the current remote device.
///
/// At most one [`Session`] exists at a time. Changing the remote tears the
/// old session down completely (socket closed, IO task joined) before the
/// new socket is bound, so two sockets never compete for the same local
/// port. The [`EventHub`] outlives sessions: subscriptions taken from the
/// link keep receiving after a reconnect.
#[derive(Debug)]
pub struct Link {
    config: SessionConfig,
    hub: Arc<EventHub>,
    session: Option<Session>,
}

impl Link {
    pub fn new(config: SessionConfig) -> Self {
        let hub = Arc::new(EventHub::new(config.event_capacity));
        Self {
            config,
            hub,
            session: None,
        }
    }

    /// Point the link at `remote`, replacing any current session.
    ///
    /// Returns the new local address.
    pub async fn connect(&mut self, remote: SocketAddr) -> Result<SocketAddr> {
        self.disconnect().await;
        let session = Session::bind_with_hub(remote, &self.config, Arc::clone(&self.hub)).await?;
        let local = session.local_addr();
        info!(%local, %remote, "link connected");
        self.session = Some(session);
        Ok(local)
    }

    /// Resolve `host:port` and [`connect`](Self::connect). A failed
    /// resolution leaves the current session untouched.
    pub async fn connect_to(&mut self, target: &str) -> Result<SocketAddr> {
        let remote = resolve(target).await?;
        self.connect(remote).await
    }

    /// Tear down the current session, if any.
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// A sender bound to the current session. It keeps failing with
    /// [`TransportError::Closed`] after that session is replaced.
    pub fn sender(&self) -> Result<OscSender> {
        self.current().map(Session::sender)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OscEvent> {
        self.hub.subscribe()
    }

    pub fn subscribe_address(&self, address: &str) -> broadcast::Receiver<AddressedMessage> {
        self.hub.subscribe_address(address)
    }

    pub async fn send(&self, packet: impl Into<Packet>) -> Result<()> {
        self.current()?.send(packet).await
    }

    pub async fn send_message<A, I>(&self, address: &str, args: I) -> Result<()>
    where
        A: Into<Argument>,
        I: IntoIterator<Item = A>,
    {
        self.current()?.send_message(address, args).await
    }

    pub async fn send_native(&self, address: &str, args: &[Value]) -> Result<()> {
        self.current()?.send_native(address, args).await
    }

    fn current(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
