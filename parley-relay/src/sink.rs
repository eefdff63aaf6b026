//! Downstream sinks for relayed fragments

use async_trait::async_trait;
use futures::Stream;
use parley_core::{Error, Result};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The client-facing side of one relay operation
///
/// A relay calls `send` once per fragment, in order, then exactly one of
/// `close` or `fail`. Only `send` may wait on the client; `close` and `fail`
/// must return promptly even if the client stopped reading.
#[async_trait]
pub trait FragmentSink: Send {
    /// Deliver one fragment. May wait if the client applies backpressure.
    ///
    /// Returns [`Error::DownstreamClosed`] once the client has gone away.
    async fn send(&mut self, text: &str) -> Result<()>;

    /// End the stream normally
    async fn close(&mut self);

    /// End the stream with an error signal
    async fn fail(&mut self, error: &Error);
}

/// Sink backed by a bounded channel
///
/// The paired [`RelayStream`] yields `Ok(text)` per fragment and a single
/// `Err` on failure; it ends when the sink closes.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Result<String>>>,
    // Slot held back for the error item, so `fail` never waits for room
    terminal: Option<mpsc::OwnedPermit<Result<String>>>,
}

/// Create a connected sink and stream
///
/// `capacity` fragments can be buffered ahead of the client.
pub fn channel(capacity: usize) -> (ChannelSink, RelayStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1) + 1);
    // The channel is fresh and the receiver alive, so this cannot fail
    let terminal = tx.clone().try_reserve_owned().ok();
    (
        ChannelSink {
            tx: Some(tx),
            terminal,
        },
        RelayStream {
            inner: ReceiverStream::new(rx),
        },
    )
}

#[async_trait]
impl FragmentSink for ChannelSink {
    async fn send(&mut self, text: &str) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::DownstreamClosed)?;
        tx.send(Ok(text.to_string()))
            .await
            .map_err(|_| Error::DownstreamClosed)
    }

    async fn close(&mut self) {
        self.tx.take();
        self.terminal.take();
    }

    async fn fail(&mut self, error: &Error) {
        let tx = self.tx.take();
        match self.terminal.take() {
            Some(permit) => {
                permit.send(Err(error.clone()));
            }
            None => {
                // The client may already be gone; nothing else to tell it
                if let Some(tx) = tx {
                    let _ = tx.try_send(Err(error.clone()));
                }
            }
        }
    }
}

/// Client-side stream of one relay's fragments
#[derive(Debug)]
pub struct RelayStream {
    inner: ReceiverStream<Result<String>>,
}

impl Stream for RelayStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
