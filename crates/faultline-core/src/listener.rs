use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::control::ProcessControl;
use crate::debugger::Debugger;
use crate::error::{ListenerError, ReceiveError};
use crate::event::FaultEvent;
use crate::prompt::Prompter;
use crate::registry::Registry;

/// Trait implementing the reception of fault notifications from the OS.
pub trait FaultSource: Send {
    /// Error returned by this trait.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Waits for the next fault notification, and converts it into an event.
    fn receive(&mut self) -> impl Future<Output = Result<FaultEvent, ReceiveError<Self::Error>>> + Send;
}

/// Receiver of every fault event, forwarding them to the [Registry].
pub struct Listener<S, D, C, P> {
    source: S,
    registry: Registry<D, C, P>,
    shutdown: CancellationToken,
}

impl<S, D, C, P> Listener<S, D, C, P>
where
    S: FaultSource,
    D: Debugger,
    C: ProcessControl,
    P: Prompter,
{
    /// Creates a listener receiving events from `source`.
    pub fn new(source: S, registry: Registry<D, C, P>) -> Self {
        Self {
            source,
            registry,
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses the given token to stop the listener.
    ///
    /// Without it, the listener runs until the fault channel breaks.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Receives and dispatches events until shutdown.
    ///
    /// Only a failure of the fault channel itself ends the listener with an
    /// error. Events which fail to be dispatched are logged and skipped.
    #[tracing::instrument(name = "Listener", skip_all)]
    pub async fn run(mut self) -> Result<(), ListenerError<S::Error>> {
        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("listener shutting down");
                    break Ok(());
                }
                received = self.source.receive() => received,
            };

            let event = match received {
                Ok(event) => event,
                Err(ReceiveError::Interrupted) => continue,
                Err(ReceiveError::Malformed(e)) => {
                    tracing::warn!(error = %e, "dropping malformed fault message");
                    continue;
                }
                Err(ReceiveError::Fatal(e)) => {
                    tracing::error!(error = %e, "failed to receive from the fault channel");
                    break Err(ListenerError::Channel(e));
                }
            };

            tracing::debug!(
                pid = %event.process,
                tid = %event.thread,
                kind = event.kind.name(),
                "got fault event"
            );

            if let Err(e) = self.registry.dispatch(event) {
                tracing::error!(error = %e, "failed to dispatch fault event");
            }
        }
    }
}
