//! Cancellation signal shared by the stages of one in-flight validation.
//!
//! Stages poll the token at unit boundaries; already-dispatched work runs to
//! completion and observes the signal at its next check-point.

use crate::ValidationError;
use tokio::sync::watch;

/// The cancelling side. Dropping the source does not cancel.
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// A cheaply cloneable view of the cancellation state.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that can never be cancelled.
    pub fn never() -> Self {
        CancelSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Check-point: `Err(Cancelled)` once the source has cancelled.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.is_cancelled() {
            Err(ValidationError::Cancelled)
        } else {
            Ok(())
        }
    }
}
