//! Relay coordinator
//!
//! Drives one generation from prompt to persisted reply:
//!
//! 1. claim the session in the [`SessionRegistry`] (a second relay on the
//!    same session is rejected with [`Error::RelayBusy`]),
//! 2. persist the user message,
//! 3. open the upstream stream,
//! 4. forward each fragment to the sink and append it to the accumulator,
//! 5. on end-of-stream, release the registry entry and persist the reply.
//!
//! The abort signal is checked while waiting for the upstream, while waiting
//! for each fragment and while waiting for the sink to accept one. Dropping
//! the upstream future or stream closes the connection.

use crate::config::{PartialPolicy, RelayConfig};
use crate::registry::{CancellationHandle, SessionRegistry};
use crate::sink::FragmentSink;
use futures::StreamExt;
use parley_core::{
    Backend, Error, Fragment, FragmentAccumulator, FragmentStream, GenerateRequest, Message,
    Result, Role,
};
use parley_state::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

/// Why a relay stopped before its natural end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A cancel command targeted the session
    Requested,
    /// The downstream client went away
    DownstreamClosed,
}

/// How a relay operation ended
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    /// The upstream finished and the reply was persisted
    Completed {
        /// The persisted assistant message
        message: Message,
    },
    /// The relay was aborted; the downstream stream was closed without error
    Cancelled {
        /// Why the relay stopped
        reason: CancelReason,
        /// Fragments forwarded before the abort
        fragments: usize,
        /// The stored partial reply, under [`PartialPolicy::PersistInterrupted`]
        partial: Option<Message>,
    },
}

enum Ending {
    Natural,
    Cancelled(CancelReason),
    Failed(Error),
}

/// Orchestrates relay operations
///
/// One coordinator serves any number of concurrent relays; each call to
/// [`relay`](Self::relay) is independent apart from the shared registry.
#[derive(Clone)]
pub struct RelayCoordinator {
    backend: Arc<dyn Backend>,
    store: Arc<dyn RecordStore>,
    registry: SessionRegistry,
    config: RelayConfig,
}

impl RelayCoordinator {
    /// Create a coordinator
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn RecordStore>,
        registry: SessionRegistry,
        config: RelayConfig,
    ) -> Self {
        Self {
            backend,
            store,
            registry,
            config,
        }
    }

    /// The registry this coordinator registers relays in
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The record store replies are persisted to
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Signal abort for the session's relay, if any
    pub fn cancel(&self, session_id: &str) -> bool {
        self.registry.cancel(session_id)
    }

    /// Run one relay operation to completion
    ///
    /// Every path ends the sink exactly once: `close` on completion or
    /// cancellation, `fail` on error. Errors are also returned.
    pub async fn relay(
        &self,
        session_id: &str,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<RelayOutcome> {
        let Some(handle) = self.registry.try_register(session_id) else {
            return fail(sink, Error::RelayBusy(session_id.to_string())).await;
        };
        self.relay_claimed(handle, prompt, sink).await
    }

    /// Run a relay on a registry entry the caller already claimed
    ///
    /// `handle` must come from [`SessionRegistry::try_register`] on this
    /// coordinator's registry. Callers claim first when they need to act on
    /// the session before the relay starts without racing another sender.
    pub async fn relay_claimed(
        &self,
        handle: CancellationHandle,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<RelayOutcome> {
        let span = info_span!("relay", session_id = %handle.session_id());
        self.run(handle, prompt, sink).instrument(span).await
    }

    async fn run(
        &self,
        handle: CancellationHandle,
        prompt: &str,
        sink: &mut dyn FragmentSink,
    ) -> Result<RelayOutcome> {
        if let Err(e) = self
            .store
            .append_message(handle.session_id(), Role::User, prompt)
            .await
        {
            return self.fail_claimed(&handle, sink, e.into()).await;
        }

        let mut request = GenerateRequest::new(prompt);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }

        let token = handle.token().clone();
        let mut stream = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Cancelled before upstream answered");
                return self
                    .finish_cancelled(&handle, CancelReason::Requested, FragmentAccumulator::new(), sink)
                    .await;
            }
            opened = self.backend.generate(request) => match opened {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Upstream call failed");
                    return self.fail_claimed(&handle, sink, e).await;
                }
            },
        };

        let mut accumulator = FragmentAccumulator::new();
        let ending = loop {
            let item = tokio::select! {
                biased;
                _ = token.cancelled() => break Ending::Cancelled(CancelReason::Requested),
                item = next_fragment(&mut stream, self.config.idle_timeout) => item,
            };

            let fragment = match item {
                Some(Ok(fragment)) if fragment.is_final => break Ending::Natural,
                Some(Ok(fragment)) => fragment,
                Some(Err(e)) => break Ending::Failed(e),
                None => break Ending::Natural,
            };

            let sent = tokio::select! {
                biased;
                _ = token.cancelled() => break Ending::Cancelled(CancelReason::Requested),
                sent = sink.send(&fragment.text) => sent,
            };
            if sent.is_err() {
                break Ending::Cancelled(CancelReason::DownstreamClosed);
            }
            accumulator.push(&fragment);
        };
        // Closes the upstream connection
        drop(stream);

        match ending {
            Ending::Natural => self.finish_natural(&handle, accumulator, sink).await,
            Ending::Cancelled(reason) => {
                self.finish_cancelled(&handle, reason, accumulator, sink)
                    .await
            }
            Ending::Failed(e) => {
                warn!(error = %e, fragments = accumulator.fragments(), "Upstream stream failed");
                self.fail_claimed(&handle, sink, e).await
            }
        }
    }

    /// Report a failure while the registry entry is still held
    ///
    /// The entry is released only after the sink has taken the error, so a
    /// stop command can still end a relay whose client stopped reading.
    async fn fail_claimed(
        &self,
        handle: &CancellationHandle,
        sink: &mut dyn FragmentSink,
        error: Error,
    ) -> Result<RelayOutcome> {
        let token = handle.token().clone();
        let cancelled = tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = sink.fail(&error) => false,
        };
        if cancelled {
            debug!(error = %error, "Cancelled while reporting failure");
            sink.close().await;
        }
        self.registry.release_handle(handle);
        Err(error)
    }

    async fn finish_natural(
        &self,
        handle: &CancellationHandle,
        accumulator: FragmentAccumulator,
        sink: &mut dyn FragmentSink,
    ) -> Result<RelayOutcome> {
        // Whoever removes the registry entry first decides the outcome. If a
        // cancel got there first, this relay counts as cancelled.
        if !self.registry.release_handle(handle) {
            debug!("Cancel won the race with natural completion");
            return self
                .finish_cancelled(handle, CancelReason::Requested, accumulator, sink)
                .await;
        }

        let fragments = accumulator.fragments();
        let message = Message::assistant(handle.session_id(), accumulator.into_content());
        match self.store.save_message(message).await {
            Ok(message) => {
                sink.close().await;
                info!(fragments, chars = message.content.len(), "Relay completed");
                Ok(RelayOutcome::Completed { message })
            }
            // The entry is gone; the sink must not wait on the client here
            Err(e) => fail(sink, e.into()).await,
        }
    }

    async fn finish_cancelled(
        &self,
        handle: &CancellationHandle,
        reason: CancelReason,
        accumulator: FragmentAccumulator,
        sink: &mut dyn FragmentSink,
    ) -> Result<RelayOutcome> {
        // No-op after a cancel command, which already removed the entry
        self.registry.release_handle(handle);
        sink.close().await;

        let fragments = accumulator.fragments();
        info!(?reason, fragments, "Relay cancelled");

        let partial = match self.config.partial_policy {
            PartialPolicy::PersistInterrupted if fragments > 0 => {
                let message =
                    Message::assistant(handle.session_id(), accumulator.into_content()).interrupted();
                Some(self.store.save_message(message).await?)
            }
            _ => None,
        };

        Ok(RelayOutcome::Cancelled {
            reason,
            fragments,
            partial,
        })
    }
}

async fn next_fragment(
    stream: &mut FragmentStream,
    idle_timeout: Option<Duration>,
) -> Option<Result<Fragment>> {
    match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(item) => item,
            Err(_) => Some(Err(Error::IdleTimeout(limit))),
        },
        None => stream.next().await,
    }
}

async fn fail(sink: &mut dyn FragmentSink, error: Error) -> Result<RelayOutcome> {
    sink.fail(&error).await;
    Err(error)
}
