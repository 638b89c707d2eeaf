//! Mock injection backend for tests.
//!
//! # Why a mock backend?
//!
//! The real backends create virtual devices and synthesize OS input, which:
//!
//! - Requires `/dev/uinput` access or an interactive Windows desktop.
//! - Actually presses keys and moves the cursor on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! `MockInjectionBackend` records every call instead.  Events go into a shared
//! `Arc<Mutex<Vec<...>>>`, so a test can keep a clone of the mock while a
//! session (possibly on another thread) owns the boxed original, then assert
//! exactly what was injected and in what order.
//!
//! # Failure flags
//!
//! - `should_fail`: every keyboard/mouse call returns [`InjectionError::Event`].
//! - `fail_device`: every call returns [`InjectionError::Device`], as if the
//!   virtual device had been unplugged.
//! - `with_gamepad`: whether [`InjectionBackend::gamepad`] offers a gamepad.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use vgp_core::{GamepadAxis, GamepadButton, HidKeyCode, OutputMode, PointerButton};

use crate::application::inject::{InjectionBackend, InjectionError, VirtualGamepad};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedEvent {
    KeyDown(HidKeyCode),
    KeyUp(HidKeyCode),
    PointerMove { dx: i32, dy: i32 },
    PointerButton { button: PointerButton, pressed: bool },
    Scroll(i32),
    GamepadButton { button: GamepadButton, pressed: bool },
    GamepadAxis { axis: GamepadAxis, value: f32 },
    GamepadCommit,
}

/// A backend that records all calls without touching the OS.
///
/// Clones share the same record and the same `dropped` flag.
#[derive(Debug, Clone, Default)]
pub struct MockInjectionBackend {
    /// Every successful call, in order.
    pub events: Arc<Mutex<Vec<InjectedEvent>>>,
    /// Set once any clone is dropped by its owner (the "device" was released).
    pub dropped: Arc<AtomicBool>,
    pub should_fail: bool,
    pub fail_device: bool,
    pub with_gamepad: bool,
}

impl MockInjectionBackend {
    /// Creates a mock with empty records, no failures, and a gamepad.
    pub fn new() -> Self {
        Self::for_mode(OutputMode::Gamepad)
    }

    /// Creates a mock the way the platform factory would for `mode`.
    pub fn for_mode(mode: OutputMode) -> Self {
        let mut mock = Self::default();
        mock.with_gamepad = mode == OutputMode::Gamepad;
        mock
    }

    /// Returns a copy of everything recorded so far.
    pub fn recorded(&self) -> Vec<InjectedEvent> {
        self.lock().clone()
    }

    /// Returns `true` once the owning session has dropped its backend.
    pub fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<InjectedEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: InjectedEvent) -> Result<(), InjectionError> {
        if self.fail_device {
            return Err(InjectionError::Device("mock device unplugged".into()));
        }
        if self.should_fail {
            return Err(InjectionError::Event("mock failure".into()));
        }
        self.lock().push(event);
        Ok(())
    }
}

impl InjectionBackend for MockInjectionBackend {
    fn key_down(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        self.record(InjectedEvent::KeyDown(key))
    }

    fn key_up(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        self.record(InjectedEvent::KeyUp(key))
    }

    fn pointer_move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError> {
        self.record(InjectedEvent::PointerMove { dx, dy })
    }

    fn pointer_button_down(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        self.record(InjectedEvent::PointerButton { button, pressed: true })
    }

    fn pointer_button_up(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        self.record(InjectedEvent::PointerButton { button, pressed: false })
    }

    fn scroll(&mut self, delta: i32) -> Result<(), InjectionError> {
        self.record(InjectedEvent::Scroll(delta))
    }

    fn gamepad(&mut self) -> Option<&mut dyn VirtualGamepad> {
        if self.with_gamepad {
            Some(self as &mut dyn VirtualGamepad)
        } else {
            None
        }
    }
}

impl VirtualGamepad for MockInjectionBackend {
    fn set_button(&mut self, button: GamepadButton, pressed: bool) -> Result<(), InjectionError> {
        self.record(InjectedEvent::GamepadButton { button, pressed })
    }

    fn set_axis(&mut self, axis: GamepadAxis, value: f32) -> Result<(), InjectionError> {
        self.record(InjectedEvent::GamepadAxis { axis, value })
    }

    fn commit(&mut self) -> Result<(), InjectionError> {
        self.record(InjectedEvent::GamepadCommit)
    }
}

impl Drop for MockInjectionBackend {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}
