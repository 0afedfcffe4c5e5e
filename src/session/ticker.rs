use std::sync::Arc;

use tokio::sync::watch;

/// Cancels every task holding one of its [`CancelToken`]s.
///
/// Cloning shares the same flag. Cancellation is sticky.
#[derive(Clone, Debug)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    /// Create an uncancelled flag.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag, waking every waiting token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`Canceller::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A token observing this flag.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Canceller`].
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&mut self) {
        // A dropped sender counts as cancelled.
        let _ = self.rx.wait_for(|c| *c).await;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/ticker.rs"]
mod tests;
