//! # vgp-core
//!
//! Shared library for the virtual gamepad bridge containing the wire codec,
//! the mapping table, the state translator, and key code translation tables.
//!
//! It has zero dependencies on OS APIs or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! A phone acts as a game controller.  Many times per second it sends the
//! controller's state (which buttons went down or up, where the sticks and
//! triggers are) to a server on the PC.  The server turns that state into
//! keyboard, mouse, or virtual-gamepad input as if a real device were attached.
//!
//! This crate (`vgp-core`) is the platform-independent part:
//!
//! - **`protocol`** – How bytes travel over the network.  A 6-byte header and a
//!   fixed little-endian body are decoded into a [`GamepadReading`];
//!   [`FrameBuffer`] reassembles readings from a byte stream.
//!
//! - **`domain`** – Pure logic.  The [`MappingTable`] says what each control
//!   does; [`translate`] compares two readings and produces the ordered
//!   [`InjectionCommand`]s for the change.
//!
//! - **`keymap`** – Translation tables from the canonical USB HID Usage IDs used
//!   in profiles to Windows Virtual Keys and Linux input-event codes.

pub mod domain;
pub mod keymap;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `vgp_core::MappingTable` instead of `vgp_core::domain::mapping::MappingTable`.
pub use domain::mapping::{
    ButtonAction, MappingError, MappingStore, MappingTable, MappingView, PointerButton, Stick,
    ThumbstickMapping, Trigger, TriggerMapping, MAX_POINTER_SENSITIVITY,
};
pub use domain::translator::{
    release_all, translate, GamepadAxis, InjectionCommand, OutputMode, TranslateOptions,
    TranslatorState,
};
pub use keymap::hid::HidKeyCode;
pub use protocol::codec::{decode, encode, ProtocolError};
pub use protocol::framing::FrameBuffer;
pub use protocol::reading::{GamepadButton, GamepadButtons, GamepadReading};
