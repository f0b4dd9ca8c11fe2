//! Probe/event reporting: a structured lifecycle event stream for
//! observability. Fire-and-forget and fully decoupled from the control
//! path: a slow or absent consumer never stalls a traversal.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::{ProbeBus, ProbeEmitter};
pub use event::ProbeEvent;
pub use sink::{ChannelSink, MemorySink, ProbeSink, StdOutSink};
