//! Output targets for probe events.

use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::event::ProbeEvent;

/// Abstraction over an output target that consumes probe events.
///
/// Sinks run on the bus listener task, off the traversal control path; a
/// failing sink is logged and otherwise ignored.
pub trait ProbeSink: Send + Sync {
    fn handle(&mut self, event: &ProbeEvent) -> IoResult<()>;
}

/// Writes one JSON line per event to stdout.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl ProbeSink for StdOutSink {
    fn handle(&mut self, event: &ProbeEvent) -> IoResult<()> {
        let mut line = event.to_json_value().to_string();
        line.push('\n');
        self.handle.write_all(line.as_bytes())?;
        self.handle.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<ProbeEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ProbeEvent> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl ProbeSink for MemorySink {
    fn handle(&mut self, event: &ProbeEvent) -> IoResult<()> {
        self.entries.lock().push(event.clone());
        Ok(())
    }
}

/// Forwards events to a flume channel for async consumers (dashboards,
/// SSE endpoints). A dropped receiver is reported as an error and the bus
/// carries on.
pub struct ChannelSink {
    tx: flume::Sender<ProbeEvent>,
}

impl ChannelSink {
    pub fn new(tx: flume::Sender<ProbeEvent>) -> Self {
        Self { tx }
    }
}

impl ProbeSink for ChannelSink {
    fn handle(&mut self, event: &ProbeEvent) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "probe channel closed"))
    }
}
