//! Protocol module containing the gamepad reading type, the binary codec,
//! and stream reassembly.

pub mod codec;
pub mod framing;
pub mod reading;

pub use codec::{decode, encode, ProtocolError};
pub use framing::FrameBuffer;
pub use reading::{GamepadButton, GamepadButtons, GamepadReading};
