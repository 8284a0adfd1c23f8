use std::time::Duration;

use oscprims_codec::{FlatMessage, Message};
use oscprims_transport::{resolve, AddressedMessage, OscEvent, Session, SessionConfig};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, info};

use crate::cmd::send::next_event;
use crate::cmd::{parse_duration, parse_socket_addr, runtime, ListenArgs};
use crate::exit::{codec_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let local = parse_socket_addr(&args.bind)?;
    let hello = args
        .hello
        .as_deref()
        .map(|address| Message::from_native(address, &[]))
        .transpose()
        .map_err(|err| codec_error("invalid --hello", err))?;
    let hello_interval = args
        .hello_interval
        .as_deref()
        .map(parse_duration)
        .transpose()?;

    runtime()?.block_on(async move {
        let remote = resolve(&args.remote)
            .await
            .map_err(|err| transport_error("resolve failed", err))?;
        let config = SessionConfig::default().with_local_addr(local);
        let session = Session::bind(remote, &config)
            .await
            .map_err(|err| transport_error("bind failed", err))?;
        info!(local = %session.local_addr(), %remote, "listening");

        let mut feed = match &args.address {
            Some(address) => Feed::Address {
                address: address.clone(),
                rx: session.subscribe_address(address),
            },
            None => Feed::All(session.subscribe()),
        };

        if let Some(hello) = &hello {
            session
                .send(hello.clone())
                .await
                .map_err(|err| transport_error("hello failed", err))?;
        }
        let mut ticker = hello_interval.map(resend_ticker);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut printed = 0usize;
        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("interrupted");
                    break Ok(SUCCESS);
                }
                _ = tick(&mut ticker) => {
                    if let Some(hello) = &hello {
                        if let Err(err) = session.send(hello.clone()).await {
                            break Err(transport_error("hello failed", err));
                        }
                    }
                }
                event = feed.next() => {
                    let Some(event) = event else {
                        break Ok(SUCCESS);
                    };
                    print_event(&event, format);
                    printed = printed.saturating_add(1);
                    if args.count.is_some_and(|count| printed >= count) {
                        break Ok(SUCCESS);
                    }
                }
            }
        };

        session.close().await;
        outcome
    })
}

/// What the listener prints: everything, or one address.
enum Feed {
    All(broadcast::Receiver<OscEvent>),
    Address {
        address: String,
        rx: broadcast::Receiver<AddressedMessage>,
    },
}

impl Feed {
    async fn next(&mut self) -> Option<OscEvent> {
        match self {
            Self::All(rx) => next_event(rx).await,
            Self::Address { address, rx } => loop {
                match rx.recv().await {
                    Ok(AddressedMessage { args, from }) => {
                        return Some(OscEvent::Message {
                            message: FlatMessage {
                                address: address.clone(),
                                args,
                            },
                            from,
                        })
                    }
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "address receiver lagged"),
                    Err(RecvError::Closed) => return None,
                }
            },
        }
    }
}

fn resend_ticker(period: Duration) -> Interval {
    interval_at(Instant::now() + period, period)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
