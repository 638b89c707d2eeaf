//! Windows injection via `SendInput` and WinRT gamepad injection.
//!
//! Keyboard events are injected by *scan code* rather than virtual key, so
//! games reading raw input or DirectInput see them too.  The scan code comes
//! from `MapVirtualKeyW`, and keys that live in the extended block get
//! `KEYEVENTF_EXTENDEDKEY` (see [`vgp_core::keymap::windows_vk`]).
//!
//! Pointer motion is relative and sent with `MOUSEEVENTF_MOVE_NOCOALESCE` so
//! Windows delivers every unit step instead of merging them.
//!
//! The virtual gamepad uses `Windows.UI.Input.Preview.Injection.InputInjector`,
//! which makes the controller visible to `Windows.Gaming.Input` consumers.
//! Its button bits are the same ones the wire format uses, so no table is
//! needed.  Gamepad injection is uninitialized when the backend is dropped.
//!
//! The d-pad is reported only through the four `GamepadButtons` d-pad bits.
//! `InjectedInputGamepadInfo` has no hat field, so unlike the Linux backend
//! (which also drives `ABS_HAT0X`/`ABS_HAT0Y`) there is no separate hat axis
//! here.  Games see the same d-pad either way through `Windows.Gaming.Input`.

#![cfg(target_os = "windows")]

use tracing::{info, warn};
use vgp_core::keymap::{KeyMapper, WindowsKey};
use vgp_core::{GamepadAxis, GamepadButton, HidKeyCode, OutputMode, PointerButton};
use windows::Gaming::Input::GamepadButtons;
use windows::UI::Input::Preview::Injection::{InjectedInputGamepadInfo, InputInjector};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
    MAPVK_VK_TO_VSC, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN,
    MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_MOVE_NOCOALESCE, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};

use crate::application::inject::{InjectionBackend, InjectionError, VirtualGamepad};

/// One wheel notch in `mouseData` units.
const WHEEL_DELTA: i32 = 120;

/// [`InjectionBackend`] built on `SendInput`, plus an optional WinRT gamepad.
pub struct WindowsBackend {
    gamepad: Option<WinRtGamepad>,
}

impl WindowsBackend {
    /// Creates the backend; in [`OutputMode::Gamepad`] also the virtual gamepad.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Device`] if gamepad injection is unavailable.
    pub fn new(mode: OutputMode) -> Result<Self, InjectionError> {
        let gamepad = match mode {
            OutputMode::Gamepad => Some(WinRtGamepad::new()?),
            OutputMode::KeyboardMouse => None,
        };
        Ok(Self { gamepad })
    }
}

impl InjectionBackend for WindowsBackend {
    fn key_down(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        send_key(KeyMapper::hid_to_windows_vk(key), false)
    }

    fn key_up(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        send_key(KeyMapper::hid_to_windows_vk(key), true)
    }

    fn pointer_move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        send_mouse(dx, dy, 0, MOUSEEVENTF_MOVE | MOUSEEVENTF_MOVE_NOCOALESCE)
    }

    fn pointer_button_down(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        let flags = match button {
            PointerButton::Left => MOUSEEVENTF_LEFTDOWN,
            PointerButton::Right => MOUSEEVENTF_RIGHTDOWN,
            PointerButton::Middle => MOUSEEVENTF_MIDDLEDOWN,
        };
        send_mouse(0, 0, 0, flags)
    }

    fn pointer_button_up(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        let flags = match button {
            PointerButton::Left => MOUSEEVENTF_LEFTUP,
            PointerButton::Right => MOUSEEVENTF_RIGHTUP,
            PointerButton::Middle => MOUSEEVENTF_MIDDLEUP,
        };
        send_mouse(0, 0, 0, flags)
    }

    fn scroll(&mut self, delta: i32) -> Result<(), InjectionError> {
        if delta == 0 {
            return Ok(());
        }
        send_mouse(0, 0, delta.saturating_mul(WHEEL_DELTA), MOUSEEVENTF_WHEEL)
    }

    fn gamepad(&mut self) -> Option<&mut dyn VirtualGamepad> {
        self.gamepad.as_mut().map(|g| g as &mut dyn VirtualGamepad)
    }
}

// ── Gamepad ───────────────────────────────────────────────────────────────────

/// A `Windows.Gaming.Input` gamepad fed through `InputInjector`.
///
/// The injector takes a whole report at a time, so staged changes are
/// accumulated here and sent on commit.
pub struct WinRtGamepad {
    injector: InputInjector,
    buttons: u32,
    /// Indexed by [`axis_slot`].
    axes: [f64; 6],
}

impl WinRtGamepad {
    fn new() -> Result<Self, InjectionError> {
        let injector = InputInjector::TryCreate().map_err(device_error)?;
        injector.InitializeGamepadInjection().map_err(device_error)?;
        info!("WinRT gamepad injection initialized");
        Ok(Self {
            injector,
            buttons: 0,
            axes: [0.0; 6],
        })
    }

    fn report(&self) -> windows::core::Result<InjectedInputGamepadInfo> {
        let info = InjectedInputGamepadInfo::new()?;
        info.SetButtons(GamepadButtons(self.buttons))?;
        info.SetLeftThumbstickX(self.axes[axis_slot(GamepadAxis::LeftStickX)])?;
        info.SetLeftThumbstickY(self.axes[axis_slot(GamepadAxis::LeftStickY)])?;
        info.SetRightThumbstickX(self.axes[axis_slot(GamepadAxis::RightStickX)])?;
        info.SetRightThumbstickY(self.axes[axis_slot(GamepadAxis::RightStickY)])?;
        info.SetLeftTrigger(self.axes[axis_slot(GamepadAxis::LeftTrigger)])?;
        info.SetRightTrigger(self.axes[axis_slot(GamepadAxis::RightTrigger)])?;
        Ok(info)
    }
}

impl VirtualGamepad for WinRtGamepad {
    fn set_button(&mut self, button: GamepadButton, pressed: bool) -> Result<(), InjectionError> {
        if pressed {
            self.buttons |= button.bit();
        } else {
            self.buttons &= !button.bit();
        }
        Ok(())
    }

    fn set_axis(&mut self, axis: GamepadAxis, value: f32) -> Result<(), InjectionError> {
        let (lo, hi) = if axis.is_trigger() { (0.0, 1.0) } else { (-1.0, 1.0) };
        self.axes[axis_slot(axis)] = f64::from(value.clamp(lo, hi));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), InjectionError> {
        let info = self
            .report()
            .map_err(|e| InjectionError::Event(format!("gamepad report: {e}")))?;
        self.injector.InjectGamepadInput(&info).map_err(device_error)
    }
}

impl Drop for WinRtGamepad {
    fn drop(&mut self) {
        if let Err(e) = self.injector.UninitializeGamepadInjection() {
            warn!("failed to uninitialize gamepad injection: {e}");
        } else {
            info!("WinRT gamepad injection uninitialized");
        }
    }
}

fn axis_slot(axis: GamepadAxis) -> usize {
    match axis {
        GamepadAxis::LeftStickX => 0,
        GamepadAxis::LeftStickY => 1,
        GamepadAxis::RightStickX => 2,
        GamepadAxis::RightStickY => 3,
        GamepadAxis::LeftTrigger => 4,
        GamepadAxis::RightTrigger => 5,
    }
}

fn device_error(e: windows::core::Error) -> InjectionError {
    InjectionError::Device(format!("InputInjector: {e}"))
}

// ── SendInput helpers ─────────────────────────────────────────────────────────

fn key_flags(wk: WindowsKey, key_up: bool) -> KEYBD_EVENT_FLAGS {
    let mut flags = KEYEVENTF_SCANCODE;
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    if wk.extended {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    flags
}

fn send_key(wk: WindowsKey, key_up: bool) -> Result<(), InjectionError> {
    // SAFETY: MapVirtualKeyW only reads its integer arguments.
    let scan = unsafe { MapVirtualKeyW(u32::from(wk.vk), MAPVK_VK_TO_VSC) };
    if scan == 0 {
        return Err(InjectionError::Event(format!(
            "no scan code for VK 0x{:02X}",
            wk.vk
        )));
    }

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan as u16,
                dwFlags: key_flags(wk, key_up),
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    send(&[input])
}

fn send_mouse(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> Result<(), InjectionError> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data as u32,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    send(&[input])
}

fn send(inputs: &[INPUT]) -> Result<(), InjectionError> {
    // SAFETY: `inputs` is a valid slice of fully initialized INPUT structures.
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(InjectionError::Event(format!(
            "SendInput injected {sent} of {} events (blocked by UIPI?)",
            inputs.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_flags_always_use_scan_codes() {
        let wk = WindowsKey { vk: 0x41, extended: false };
        assert_eq!(key_flags(wk, false), KEYEVENTF_SCANCODE);
        assert_eq!(key_flags(wk, true), KEYEVENTF_SCANCODE | KEYEVENTF_KEYUP);
    }

    #[test]
    fn test_key_flags_mark_extended_keys() {
        let up_arrow = KeyMapper::hid_to_windows_vk(HidKeyCode::ArrowUp);
        let flags = key_flags(up_arrow, false);
        assert_eq!(flags & KEYEVENTF_EXTENDEDKEY, KEYEVENTF_EXTENDEDKEY);
    }

    #[test]
    fn test_axis_slots_are_distinct() {
        let mut slots: Vec<usize> = GamepadAxis::ALL.iter().map(|a| axis_slot(*a)).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), GamepadAxis::ALL.len());
    }

    #[test]
    fn test_gamepad_button_bits_match_winrt() {
        // Windows.Gaming.Input.GamepadButtons values
        assert_eq!(GamepadButtons::A.0, GamepadButton::A.bit());
        assert_eq!(GamepadButtons::DPadUp.0, GamepadButton::DPadUp.bit());
        assert_eq!(GamepadButtons::Paddle4.0, GamepadButton::Paddle4.bit());
    }
}
