//! Probe bus: receives events and broadcasts them to sinks.
//!
//! The bus owns an unbounded channel and a background listener task, so
//! emission from the traversal loop is a non-blocking send. Reporting is
//! best-effort by construction: sink errors are logged, never propagated.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::oneshot, task};
use tracing::warn;

use super::event::ProbeEvent;
use super::sink::{ProbeSink, StdOutSink};

/// Cheap clonable handle producers use to emit events.
///
/// A disconnected emitter (no bus) degrades to a no-op, so code under test
/// or embedded without observability pays nothing.
#[derive(Clone, Debug, Default)]
pub struct ProbeEmitter {
    tx: Option<flume::Sender<ProbeEvent>>,
}

impl ProbeEmitter {
    /// An emitter with no bus behind it; every emit is a no-op.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub(crate) fn new(tx: flume::Sender<ProbeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Fire-and-forget emission; a closed bus is silently tolerated.
    pub fn emit(&self, event: ProbeEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

/// Broadcasts probe events to pluggable sinks.
pub struct ProbeBus {
    sinks: Arc<Mutex<Vec<Box<dyn ProbeSink>>>>,
    channel: (flume::Sender<ProbeEvent>, flume::Receiver<ProbeEvent>),
    listener: Mutex<Option<ListenerState>>,
}

impl Default for ProbeBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl ProbeBus {
    pub fn with_sink<T: ProbeSink + 'static>(sink: T) -> Self {
        Self::with_sinks(vec![Box::new(sink)])
    }

    pub fn with_sinks(sinks: Vec<Box<dyn ProbeSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Mutex::new(None),
        }
    }

    /// Dynamically add a sink (per-request streaming, extra telemetry).
    pub fn add_sink<T: ProbeSink + 'static>(&self, sink: T) {
        self.sinks.lock().push(Box::new(sink));
    }

    /// Emitter handle for the runner and invocation contexts.
    pub fn emitter(&self) -> ProbeEmitter {
        ProbeEmitter::new(self.channel.0.clone())
    }

    /// Spawn the background listener task. Idempotent.
    pub fn listen(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => {
                            let mut sinks = sinks.lock();
                            for sink in sinks.iter_mut() {
                                if let Err(error) = sink.handle(&event) {
                                    warn!(%error, "probe sink failed; event dropped for this sink");
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the listener after draining already-queued events.
    pub async fn stop(&self) {
        let state = self.listener.lock().take();
        if let Some(state) = state {
            // Drain what is already queued before signalling shutdown.
            while !self.channel.1.is_empty() {
                tokio::task::yield_now().await;
            }
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for ProbeBus {
    fn drop(&mut self) {
        if let Some(state) = self.listener.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}
