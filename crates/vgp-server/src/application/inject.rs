//! The injection capability: how translated commands reach the operating system.
//!
//! This module sits at the application layer and only defines the seam.  The
//! platform implementations (`uinput` on Linux, `SendInput` plus WinRT gamepad
//! injection on Windows) and the recording mock live in the infrastructure
//! layer and are selected by a factory at startup.
//!
//! # Two kinds of failure (for beginners)
//!
//! Synthesizing one event can fail for boring reasons: the OS rejected it, or
//! a key has no native code on this platform.  Losing one frame of input is
//! harmless, so those errors are logged and the session carries on.
//!
//! Losing the *virtual device* is different.  Every following call would fail
//! too, so [`InjectionError::is_fatal`] tells the session to stop injecting
//! until a new backend is supplied.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use vgp_core::{GamepadAxis, GamepadButton, HidKeyCode, PointerButton};

/// How long a synthesized click holds the button down.
///
/// Long enough that applications polling input see a press, short enough
/// that none of them treat it as a drag.
pub const CLICK_HOLD: Duration = Duration::from_millis(10);

/// Pause between the two clicks of a double click.
pub const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(50);

/// Error type for injection operations.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The OS rejected a single synthesized event.
    #[error("event rejected: {0}")]
    Event(String),

    /// The key has no native code on this platform.
    #[error("no native key code for {0:?}")]
    UnmappedKey(HidKeyCode),

    /// The virtual device could not be created or has stopped working.
    #[error("virtual device failure: {0}")]
    Device(String),
}

impl InjectionError {
    /// Returns `true` when the backend can no longer inject anything.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InjectionError::Device(_))
    }
}

/// Keyboard and mouse synthesis, plus an optional virtual gamepad.
///
/// A backend owns its OS resources: creating one claims the virtual devices
/// and dropping it must make them disappear from the OS device list.
///
/// Methods take `&mut self` because a backend is exclusively owned by one
/// session on one thread.
pub trait InjectionBackend {
    /// Presses `key`.
    fn key_down(&mut self, key: HidKeyCode) -> Result<(), InjectionError>;

    /// Releases `key`.
    fn key_up(&mut self, key: HidKeyCode) -> Result<(), InjectionError>;

    /// Moves the pointer by a relative offset; positive `dy` is down.
    ///
    /// Implementations never clamp; the OS keeps the pointer on screen.
    fn pointer_move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError>;

    /// Presses a mouse button.
    fn pointer_button_down(&mut self, button: PointerButton) -> Result<(), InjectionError>;

    /// Releases a mouse button.
    fn pointer_button_up(&mut self, button: PointerButton) -> Result<(), InjectionError>;

    /// Scrolls the wheel by `delta` notches; positive scrolls up.
    fn scroll(&mut self, delta: i32) -> Result<(), InjectionError>;

    /// Presses and releases `button`, holding it for [`CLICK_HOLD`].
    fn click(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        self.pointer_button_down(button)?;
        thread::sleep(CLICK_HOLD);
        self.pointer_button_up(button)
    }

    /// Two clicks separated by [`DOUBLE_CLICK_GAP`].
    fn double_click(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        self.click(button)?;
        thread::sleep(DOUBLE_CLICK_GAP);
        self.click(button)
    }

    /// The virtual gamepad, if this backend created one.
    fn gamepad(&mut self) -> Option<&mut dyn VirtualGamepad> {
        None
    }
}

/// A virtual game controller registered with the OS.
///
/// Changes are staged with [`set_button`](Self::set_button) and
/// [`set_axis`](Self::set_axis) and become visible together on
/// [`commit`](Self::commit), as one input report.
#[cfg_attr(test, mockall::automock)]
pub trait VirtualGamepad {
    /// Stages a button state.
    fn set_button(&mut self, button: GamepadButton, pressed: bool) -> Result<(), InjectionError>;

    /// Stages an axis value; sticks are in `[-1, 1]` (positive Y up), triggers in `[0, 1]`.
    fn set_axis(&mut self, axis: GamepadAxis, value: f32) -> Result<(), InjectionError>;

    /// Publishes every staged change as one report.
    fn commit(&mut self) -> Result<(), InjectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[derive(Default)]
    struct ButtonLog {
        events: Vec<(PointerButton, bool)>,
    }

    impl InjectionBackend for ButtonLog {
        fn key_down(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
            Err(InjectionError::UnmappedKey(key))
        }

        fn key_up(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
            Err(InjectionError::UnmappedKey(key))
        }

        fn pointer_move_by(&mut self, _dx: i32, _dy: i32) -> Result<(), InjectionError> {
            Ok(())
        }

        fn pointer_button_down(&mut self, button: PointerButton) -> Result<(), InjectionError> {
            self.events.push((button, true));
            Ok(())
        }

        fn pointer_button_up(&mut self, button: PointerButton) -> Result<(), InjectionError> {
            self.events.push((button, false));
            Ok(())
        }

        fn scroll(&mut self, _delta: i32) -> Result<(), InjectionError> {
            Ok(())
        }
    }

    #[test]
    fn test_only_device_errors_are_fatal() {
        assert!(InjectionError::Device("gone".into()).is_fatal());
        assert!(!InjectionError::Event("rejected".into()).is_fatal());
        assert!(!InjectionError::UnmappedKey(HidKeyCode::F12).is_fatal());
    }

    #[test]
    fn test_default_click_presses_holds_and_releases() {
        // Arrange
        let mut backend = ButtonLog::default();
        let started = Instant::now();

        // Act
        backend.click(PointerButton::Left).unwrap();

        // Assert
        assert!(started.elapsed() >= CLICK_HOLD);
        assert_eq!(
            backend.events,
            vec![(PointerButton::Left, true), (PointerButton::Left, false)]
        );
    }

    #[test]
    fn test_default_double_click_is_two_clicks() {
        let mut backend = ButtonLog::default();
        backend.double_click(PointerButton::Right).unwrap();
        assert_eq!(backend.events.len(), 4);
        assert!(backend.events.iter().all(|(b, _)| *b == PointerButton::Right));
    }

    #[test]
    fn test_default_backend_has_no_gamepad() {
        let mut backend = ButtonLog::default();
        assert!(backend.gamepad().is_none());
    }
}
