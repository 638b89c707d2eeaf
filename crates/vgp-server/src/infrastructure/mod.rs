//! Infrastructure layer for the gamepad server.
//!
//! Contains OS-facing adapters: input injection APIs, TCP network I/O, and
//! configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `vgp_core`,
//! but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`injection`** – OS-specific implementations of `InjectionBackend`.
//!   The correct implementation is selected at compile time using `#[cfg(target_os)]`.
//!   A `MockInjectionBackend` is also provided for tests.
//!
//! - **`network`** – TCP listener that accepts one controller client at a time
//!   and hands its bytes to a dedicated injection thread.
//!
//! - **`storage`** – TOML configuration: server settings, output mode, and
//!   mapping profiles.

pub mod injection;
pub mod network;
pub mod storage;
