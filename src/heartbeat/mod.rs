//! Heartbeat contract between workers and the coordinator.
//!
//! - [`message`]: request and response payloads
//! - [`transport`]: the abstract exchange and an in-process implementation

pub mod message;
pub mod transport;

pub use message::{Command, HeartbeatRequest, HeartbeatResponse};
pub use transport::{HeartbeatError, HeartbeatTransport, LocalTransport};
