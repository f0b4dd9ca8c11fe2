//! Cooperative cancellation.
//!
//! The runner checks the signal before dispatching each node and threads
//! it through the invocation context so long-running handlers can fail
//! fast. The engine never forcibly preempts a handler.

use tokio::sync::watch;

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Clonable observer side of a cancellation signal.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that never fires, for runs without a controller.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn aborted(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is requested; pends forever on a
    /// never-signal.
    pub async fn cancelled(&self) {
        match self.rx.clone() {
            None => std::future::pending().await,
            Some(mut rx) => {
                while !*rx.borrow_and_update() {
                    if rx.changed().await.is_err() {
                        // Controller dropped without aborting.
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}
