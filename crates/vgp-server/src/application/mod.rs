//! Application layer for the gamepad server.
//!
//! # What lives here?
//!
//! - **`inject`** – The `InjectionBackend` capability: the seam between
//!   translated commands and the operating system.  Implementations are
//!   supplied by the infrastructure layer at construction time.
//!
//! - **`session`** – One connection's decode → translate → inject loop.  It
//!   owns the translator state and the backend, and decides what happens when
//!   decoding or injection fails.
//!
//! Nothing in this layer touches sockets, files, or OS input APIs directly.

pub mod inject;
pub mod session;
