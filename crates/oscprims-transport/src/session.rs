//! Duplex OSC session over one UDP socket.
//!
//! One tokio task owns the socket exclusively. It sends queued outbound
//! datagrams to the fixed remote address and decodes every inbound datagram,
//! so all traffic leaves from and arrives at the same local port. Consoles
//! that answer the source port of a request depend on this.
//!
//! Lifecycle: [`Session::bind`] (bound) → [`Session::close`] (torn down).
//! Torn down is terminal; a new remote needs a new session.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use oscprims_codec::{decode, to_buffer, Argument, Message, Packet};
use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Result, TransportError};
use crate::events::{AddressedMessage, EventHub, OscEvent};

/// An encoded datagram waiting for the IO task.
struct SendRequest {
    datagram: Bytes,
    reply: oneshot::Sender<Result<()>>,
}

/// Cloneable handle for sending through a session's socket.
///
/// Once the session is torn down every send fails with
/// [`TransportError::Closed`].
#[derive(Debug, Clone)]
pub struct OscSender {
    tx: mpsc::Sender<SendRequest>,
    remote: SocketAddr,
}

impl OscSender {
    /// Encode and send a message or bundle. Resolves once the datagram has
    /// been handed to the OS, or with the error that prevented it.
    pub async fn send(&self, packet: impl Into<Packet>) -> Result<()> {
        let datagram = to_buffer(&packet.into())?;
        self.send_datagram(datagram).await
    }

    /// Send `address` with `args`.
    pub async fn send_message<A, I>(&self, address: &str, args: I) -> Result<()>
    where
        A: Into<Argument>,
        I: IntoIterator<Item = A>,
    {
        self.send(Message::with_args(address, args)).await
    }

    /// Send `address` with dynamically typed arguments.
    pub async fn send_native(&self, address: &str, args: &[Value]) -> Result<()> {
        self.send(Message::from_native(address, args)?).await
    }

    /// Send pre-encoded bytes verbatim.
    pub async fn send_datagram(&self, datagram: Bytes) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(SendRequest { datagram, reply })
            .await
            .map_err(|_| TransportError::Closed)?;
        done.await.map_err(|_| TransportError::Closed)?
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// True once the owning session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A bound duplex session with one remote device.
#[derive(Debug)]
pub struct Session {
    local_addr: SocketAddr,
    sender: OscSender,
    hub: Arc<EventHub>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Bind a socket and start the IO task, with a private event hub.
    pub async fn bind(remote: SocketAddr, config: &SessionConfig) -> Result<Self> {
        let hub = Arc::new(EventHub::new(config.event_capacity));
        Self::bind_with_hub(remote, config, hub).await
    }

    /// Bind a socket and start the IO task, publishing into `hub`.
    pub async fn bind_with_hub(
        remote: SocketAddr,
        config: &SessionConfig,
        hub: Arc<EventHub>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(config.local_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: config.local_addr,
                source,
            })?;
        let local_addr = socket.local_addr()?;
        info!(local = %local_addr, %remote, "OSC session bound");

        let (tx, rx) = mpsc::channel(config.send_queue.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(io_loop(
            socket,
            remote,
            Arc::clone(&hub),
            rx,
            cancel.clone(),
            config.max_datagram_size.max(1),
        ));

        Ok(Self {
            local_addr,
            sender: OscSender { tx, remote },
            hub,
            cancel,
            task: Some(task),
        })
    }

    /// The bound local address; replies from the device arrive here.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.sender.remote
    }

    /// A sender that shares this session's socket.
    pub fn sender(&self) -> OscSender {
        self.sender.clone()
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OscEvent> {
        self.hub.subscribe()
    }

    pub fn subscribe_address(&self, address: &str) -> broadcast::Receiver<AddressedMessage> {
        self.hub.subscribe_address(address)
    }

    pub async fn send(&self, packet: impl Into<Packet>) -> Result<()> {
        self.sender.send(packet).await
    }

    pub async fn send_message<A, I>(&self, address: &str, args: I) -> Result<()>
    where
        A: Into<Argument>,
        I: IntoIterator<Item = A>,
    {
        self.sender.send_message(address, args).await
    }

    pub async fn send_native(&self, address: &str, args: &[Value]) -> Result<()> {
        self.sender.send_native(address, args).await
    }

    /// Tear the session down. Returns after the IO task has exited and the
    /// socket is closed; no event fires afterwards. Queued sends fail with
    /// [`TransportError::Closed`].
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "OSC IO task ended abnormally");
            }
        }
        debug!(local = %self.local_addr, "OSC session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The IO loop. Runs as a spawned tokio task and owns the socket.
///
/// `biased` ordering: cancellation, then outbound sends, then inbound
/// datagrams. Each inbound datagram is decoded and dispatched before the
/// next is read.
async fn io_loop(
    socket: UdpSocket,
    remote: SocketAddr,
    hub: Arc<EventHub>,
    mut requests: mpsc::Receiver<SendRequest>,
    cancel: CancellationToken,
    max_datagram_size: usize,
) {
    let mut buf = vec![0u8; max_datagram_size];

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("OSC IO task cancelled");
                break;
            }

            request = requests.recv() => {
                let Some(SendRequest { datagram, reply }) = request else {
                    debug!("send channel closed, exiting OSC IO task");
                    break;
                };
                let result = match socket.send_to(&datagram, remote).await {
                    Ok(_) => {
                        trace!(%remote, bytes = datagram.len(), "datagram sent");
                        Ok(())
                    }
                    Err(err) => {
                        warn!(%remote, error = %err, "failed to send datagram");
                        Err(TransportError::Io(err))
                    }
                };
                let _ = reply.send(result);
            }

            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, from)) => {
                        trace!(%from, bytes = len, "datagram received");
                        hub.dispatch(from, decode(&buf[..len]));
                    }
                    // e.g. ICMP port-unreachable surfacing as ConnectionReset.
                    Err(err) => warn!(error = %err, "receive failed, still listening"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oscprims_codec::{Bundle, PlainValue, TimeTag};
    use tokio::time::timeout;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn loopback_config() -> SessionConfig {
        SessionConfig::default().with_local_addr("127.0.0.1:0".parse().unwrap())
    }

    async fn fake_console() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    async fn next<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
        timeout(WAIT, rx.recv())
            .await
            .expect("event should arrive in time")
            .expect("event channel should be open")
    }

    async fn recv_datagram(socket: &UdpSocket) -> (Vec<u8>, SocketAddr) {
        let mut buf = vec![0u8; 2048];
        let (len, from) = timeout(WAIT, socket.recv_from(&mut buf))
            .await
            .expect("datagram should arrive in time")
            .unwrap();
        buf.truncate(len);
        (buf, from)
    }

    #[tokio::test]
    async fn replies_arrive_on_the_request_source_port() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();
        let mut all = session.subscribe();
        let mut fader = session.subscribe_address("/ch/01/mix/fader");

        session.send(Message::new("/xremote")).await.unwrap();
        let (request, source) = recv_datagram(&console).await;
        assert_eq!(request, b"/xremote\0\0\0\0,\0\0\0");
        assert_eq!(source.port(), session.local_addr().port());

        let reply = to_buffer(&Message::new("/ch/01/mix/fader").arg(0.5f32).into()).unwrap();
        console.send_to(&reply, source).await.unwrap();

        let addressed = next(&mut fader).await;
        assert_eq!(addressed.args, vec![PlainValue::Float(0.5)]);
        assert_eq!(addressed.from, console.local_addr().unwrap());

        match next(&mut all).await {
            OscEvent::Message { message, .. } => assert_eq!(
                message.to_flat(),
                vec![PlainValue::from("/ch/01/mix/fader"), PlainValue::Float(0.5)]
            ),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(all.try_recv().is_err(), "generic event should fire once");

        session.close().await;
    }

    #[tokio::test]
    async fn bad_datagram_does_not_stop_listening() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();
        let mut all = session.subscribe();

        console.send_to(b"not osc", session.local_addr()).await.unwrap();
        match next(&mut all).await {
            OscEvent::Error { from, .. } => assert_eq!(from, console.local_addr().unwrap()),
            other => panic!("unexpected event {other:?}"),
        }

        let good = to_buffer(&Message::new("/ch/02/mix/on").arg(1).into()).unwrap();
        console.send_to(&good, session.local_addr()).await.unwrap();
        assert!(matches!(next(&mut all).await, OscEvent::Message { .. }));

        session.close().await;
    }

    #[tokio::test]
    async fn inbound_bundle_emits_bundle_event() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();
        let mut all = session.subscribe();

        let bundle = Bundle::new(TimeTag::Immediate)
            .push(Message::new("/ch/01/mix/fader").arg(0.1f32))
            .push(Message::new("/ch/02/mix/fader").arg(0.2f32));
        let buf = to_buffer(&bundle.into()).unwrap();
        console.send_to(&buf, session.local_addr()).await.unwrap();

        match next(&mut all).await {
            OscEvent::Bundle { bundle, .. } => {
                assert_eq!(bundle.timetag, TimeTag::Immediate);
                assert_eq!(bundle.elements.len(), 2);
            }
            other => panic!("unexpected event {other:?}"),
        }

        session.close().await;
    }

    #[tokio::test]
    async fn send_message_and_native_forms() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();

        session
            .send_message("/ch/01/mix/fader", [0.75f32])
            .await
            .unwrap();
        let (datagram, _) = recv_datagram(&console).await;
        assert_eq!(&datagram[20..], &[0x2C, 0x66, 0x00, 0x00, 0x3F, 0x40, 0x00, 0x00]);

        session
            .send_native("/ch/01/config/name", &[serde_json::json!("Kick")])
            .await
            .unwrap();
        let (datagram, _) = recv_datagram(&console).await;
        assert_eq!(
            oscprims_codec::decode(&datagram).unwrap().as_message().unwrap().args,
            vec![PlainValue::from("Kick")]
        );

        session.close().await;
    }

    #[tokio::test]
    async fn encoding_errors_fail_before_sending() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();

        let err = session
            .send_native("/ch/01", &[serde_json::json!({"nested": true})])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Codec(ref e) if e.is_encoding()));

        let err = session.send(Message::new("no-slash")).await.unwrap_err();
        assert!(matches!(err, TransportError::Codec(_)));

        session.close().await;
    }

    #[tokio::test]
    async fn sends_after_close_report_closed() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();
        let sender = session.sender();
        assert!(!sender.is_closed());

        session.close().await;

        assert!(sender.is_closed());
        let err = sender.send(Message::new("/xremote")).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn no_events_after_close() {
        let console = fake_console().await;
        let session = Session::bind(console.local_addr().unwrap(), &loopback_config())
            .await
            .unwrap();
        let hub = Arc::clone(session.hub());
        let mut all = hub.subscribe();
        let local = session.local_addr();

        session.close().await;

        let msg = to_buffer(&Message::new("/late").into()).unwrap();
        let _ = console.send_to(&msg, local).await;
        let late = timeout(Duration::from_millis(200), all.recv()).await;
        assert!(late.is_err(), "no event may fire after close");
    }

    #[tokio::test]
    async fn bind_error_names_address() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let config = SessionConfig::default().with_local_addr(taken.local_addr().unwrap());
        let err = Session::bind("127.0.0.1:9".parse().unwrap(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Bind { addr, .. } if addr == taken.local_addr().unwrap()));
    }
}
