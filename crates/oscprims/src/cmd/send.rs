use oscprims_codec::Message;
use oscprims_transport::{resolve, OscEvent, Session, SessionConfig};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::cmd::{native_args, parse_duration, parse_socket_addr, runtime, SendArgs};
use crate::exit::{
    codec_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
};
use crate::output::{print_event, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let local = parse_socket_addr(&args.bind)?;
    let message = Message::from_native(args.address.as_str(), &native_args(&args.args))
        .map_err(|err| codec_error("invalid message", err))?;

    runtime()?.block_on(async move {
        let remote = resolve(&args.remote)
            .await
            .map_err(|err| transport_error("resolve failed", err))?;
        let config = SessionConfig::default().with_local_addr(local);
        let session = Session::bind(remote, &config)
            .await
            .map_err(|err| transport_error("bind failed", err))?;

        // Subscribe before sending so a fast reply is not missed.
        let mut events = session.subscribe();
        session
            .send(message)
            .await
            .map_err(|err| transport_error("send failed", err))?;
        debug!(%remote, address = %args.address, "message sent");

        let outcome = if args.wait {
            match tokio::time::timeout(wait_timeout, next_event(&mut events)).await {
                Ok(Some(event)) => {
                    print_event(&event, format);
                    Ok(SUCCESS)
                }
                Ok(None) => Err(CliError::new(
                    TRANSPORT_ERROR,
                    "session closed before a reply arrived",
                )),
                Err(_) => Err(CliError::new(
                    TIMEOUT,
                    format!("no reply from {remote} within {wait_timeout:?}"),
                )),
            }
        } else {
            Ok(SUCCESS)
        };

        session.close().await;
        outcome
    })
}

/// Next event from the hub, skipping over any lag.
pub(crate) async fn next_event(events: &mut broadcast::Receiver<OscEvent>) -> Option<OscEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event receiver lagged"),
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use oscprims_codec::CodecError;

    use super::*;

    fn error_event(n: u16) -> OscEvent {
        OscEvent::Error {
            error: CodecError::InvalidBundleMarker,
            from: SocketAddr::from(([127, 0, 0, 1], n)),
        }
    }

    #[tokio::test]
    async fn next_event_skips_lag() {
        let (tx, mut rx) = broadcast::channel(1);
        tx.send(error_event(1)).unwrap();
        tx.send(error_event(2)).unwrap();

        let event = next_event(&mut rx).await.expect("event after lag");
        assert_eq!(event.sender_addr().port(), 2);
    }

    #[tokio::test]
    async fn next_event_ends_when_hub_is_gone() {
        let (tx, mut rx) = broadcast::channel::<OscEvent>(1);
        drop(tx);
        assert!(next_event(&mut rx).await.is_none());
    }
}
