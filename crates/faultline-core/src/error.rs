use crate::event::ProcessId;

/// Error returned when an event could not be dispatched.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError<E> {
    /// Attaching to a new target process failed.
    ///
    /// The process was terminated.
    #[error("failed to attach to process {process}")]
    Attach {
        /// The process which could not be attached to.
        process: ProcessId,

        /// Debugger error.
        #[source]
        source: E,
    },

    /// The mailbox of a freshly created handler rejected the event.
    #[error("mailbox of process {0} is closed")]
    MailboxClosed(ProcessId),
}

/// Error returned by a [FaultSource](crate::listener::FaultSource).
#[derive(thiserror::Error, Debug)]
pub enum ReceiveError<E> {
    /// The receive call was interrupted, and should be retried.
    #[error("receive interrupted")]
    Interrupted,

    /// A message was received but could not be decoded.
    #[error("malformed fault message")]
    Malformed(#[source] E),

    /// The fault channel is broken.
    #[error("fault channel failure")]
    Fatal(#[source] E),
}

/// Error ending the [Listener](crate::listener::Listener).
#[derive(thiserror::Error, Debug)]
pub enum ListenerError<E> {
    /// The fault channel is broken, no more events can be received.
    #[error("failed to receive from the fault channel")]
    Channel(#[source] E),
}
