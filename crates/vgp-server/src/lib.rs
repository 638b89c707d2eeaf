//! vgp-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does vgp-server do? (for beginners)
//!
//! A phone (or any other device) with a game controller attached streams the
//! controller's state to this PC over TCP, one small binary message per
//! change.  The server turns each message into real input on the PC:
//!
//! 1. Accepts one client at a time on the configured port.
//! 2. Decodes the gamepad readings with `vgp-core`.
//! 3. Translates them through the active mapping profile into key presses,
//!    mouse clicks and pointer motion, or into updates of a virtual gamepad.
//! 4. Injects the result through the platform backend (`uinput` on Linux,
//!    `SendInput` plus WinRT gamepad injection on Windows).
//!
//! When the client disconnects, everything it held down is released and the
//! virtual devices are removed.

/// Application layer: the injection capability and the session loop.
pub mod application;

/// Infrastructure layer: OS injection backends, network, and config storage.
pub mod infrastructure;
