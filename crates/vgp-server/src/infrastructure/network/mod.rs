//! Network infrastructure: the TCP listener controller clients connect to.
//!
//! Architecture:
//! - [`GamepadServer`] owns the listener and serves one client at a time.
//! - Each connection gets an [`InjectionWorker`](worker::InjectionWorker):
//!   a dedicated thread that creates the backend and owns the session.
//! - Socket bytes travel to that thread, unparsed and in order, over a FIFO
//!   channel.  The async side never decodes anything.
//! - [`ConnectionStats`] are logged periodically and reset per connection.

use thiserror::Error;

pub mod server;
pub mod stats;
pub mod worker;

pub use server::{GamepadServer, ServerOptions};
pub use stats::ConnectionStats;

/// Errors that can occur in the network layer.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the listener or a connection.
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The injection thread exited while the client was still sending.
    #[error("injection thread exited unexpectedly")]
    WorkerGone,
}
