//! Transport-independent link policy
//!
//! Outbound buffering, handshake liveness and transport selection.

pub mod arbiter;
pub mod handshake;
pub mod queue;

pub use arbiter::{choose_route, LinkArbiter, LinkPreference, Route};
pub use handshake::{Acknowledged, HandshakeManager, HandshakePoll, HandshakeState, HandshakeTimings};
pub use queue::{FlushOutcome, OutboundQueue, PushOutcome, QueuedLine, QUEUE_CAPACITY};
