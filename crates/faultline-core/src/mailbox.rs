use tokio::sync::mpsc;

use crate::event::FaultEvent;

/// Creates a new mailbox, returning its producer and consumer halves.
pub fn mailbox() -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MailboxSender(tx), Mailbox(rx))
}

/// Producer half of a [Mailbox].
///
/// Pushing never blocks, and may happen from any number of threads.
#[derive(Clone, Debug)]
pub struct MailboxSender(mpsc::UnboundedSender<FaultEvent>);

impl MailboxSender {
    /// Pushes an event at the back of the mailbox.
    ///
    /// If the mailbox was closed, the event is handed back to the caller.
    pub fn push(&self, event: FaultEvent) -> Result<(), FaultEvent> {
        self.0.send(event).map_err(|e| e.0)
    }

    /// Returns whether the consumer half was closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Ordered queue of events addressed to a single target process.
///
/// Events are popped in the order they were pushed, by a single consumer.
#[derive(Debug)]
pub struct Mailbox(mpsc::UnboundedReceiver<FaultEvent>);

impl Mailbox {
    /// Waits for the next event.
    ///
    /// Returns `None` once the mailbox is closed and drained, or when every
    /// producer is gone.
    pub async fn pop(&mut self) -> Option<FaultEvent> {
        self.0.recv().await
    }

    /// Closes the mailbox, making further pushes fail.
    ///
    /// Events pushed before closing remain available.
    pub fn close(&mut self) {
        self.0.close();
    }

    /// Removes and returns every event currently queued.
    pub fn drain(&mut self) -> Vec<FaultEvent> {
        std::iter::from_fn(|| self.0.try_recv().ok()).collect()
    }
}
