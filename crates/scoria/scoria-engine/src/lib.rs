//! `scoria-engine`: the TCP append-and-replay engine.
//!
//! One [`Supervisor`] owns the listening socket and the lifecycle of every
//! connection. Each accepted client gets its own worker thread that frames
//! the inbound byte stream at newlines, appends complete lines to the shared
//! log, and answers every appended line by replaying the whole log back to
//! the client.

mod supervisor;
mod worker;

pub use supervisor::Supervisor;
