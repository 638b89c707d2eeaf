//! USB HID Usage ID to Linux input-event key code translation.
//!
//! Linux `uinput` devices speak the kernel's `KEY_*` codes from
//! `<linux/input-event-codes.h>`.  These are not X11 KeySyms: they name
//! physical keys (like HID does) and are what the virtual keyboard writes as
//! `EV_KEY` events.  The kernel's own `hid-input.c` table is the reference for
//! the pairs below.
//!
//! Every code produced here lies in `KEY_ESC..=KEY_COMPOSE` (1..=127), the
//! range the virtual keyboard registers.

use super::hid::HidKeyCode;

/// `KEY_ESC`, the lowest key code the virtual keyboard enables.
pub const KEY_CODE_MIN: u16 = 1;

/// `KEY_COMPOSE`, the highest key code the virtual keyboard enables.
pub const KEY_CODE_MAX: u16 = 127;

/// Translates a HID Usage ID to a Linux `KEY_*` code.
///
/// Total over [`HidKeyCode`], like the Windows table.
pub fn hid_to_evdev(hid: HidKeyCode) -> u16 {
    use HidKeyCode::*;

    match hid {
        KeyA => 30,
        KeyB => 48,
        KeyC => 46,
        KeyD => 32,
        KeyE => 18,
        KeyF => 33,
        KeyG => 34,
        KeyH => 35,
        KeyI => 23,
        KeyJ => 36,
        KeyK => 37,
        KeyL => 38,
        KeyM => 50,
        KeyN => 49,
        KeyO => 24,
        KeyP => 25,
        KeyQ => 16,
        KeyR => 19,
        KeyS => 31,
        KeyT => 20,
        KeyU => 22,
        KeyV => 47,
        KeyW => 17,
        KeyX => 45,
        KeyY => 21,
        KeyZ => 44,

        Digit1 => 2,
        Digit2 => 3,
        Digit3 => 4,
        Digit4 => 5,
        Digit5 => 6,
        Digit6 => 7,
        Digit7 => 8,
        Digit8 => 9,
        Digit9 => 10,
        Digit0 => 11,

        Enter => 28,
        Escape => 1,
        Backspace => 14,
        Tab => 15,
        Space => 57,
        Minus => 12,
        Equal => 13,
        BracketLeft => 26,  // KEY_LEFTBRACE
        BracketRight => 27, // KEY_RIGHTBRACE
        Backslash => 43,
        Semicolon => 39,
        Quote => 40,        // KEY_APOSTROPHE
        Backquote => 41,    // KEY_GRAVE
        Comma => 51,
        Period => 52,       // KEY_DOT
        Slash => 53,
        CapsLock => 58,

        F1 => 59,
        F2 => 60,
        F3 => 61,
        F4 => 62,
        F5 => 63,
        F6 => 64,
        F7 => 65,
        F8 => 66,
        F9 => 67,
        F10 => 68,
        F11 => 87,
        F12 => 88,

        PrintScreen => 99, // KEY_SYSRQ
        ScrollLock => 70,
        Pause => 119,
        Insert => 110,
        Home => 102,
        PageUp => 104,
        Delete => 111,
        End => 107,
        PageDown => 109,
        ArrowRight => 106,
        ArrowLeft => 105,
        ArrowDown => 108,
        ArrowUp => 103,

        NumLock => 69,
        NumpadDivide => 98,   // KEY_KPSLASH
        NumpadMultiply => 55, // KEY_KPASTERISK
        NumpadSubtract => 74,
        NumpadAdd => 78,
        NumpadEnter => 96,
        Numpad1 => 79,
        Numpad2 => 80,
        Numpad3 => 81,
        Numpad4 => 75,
        Numpad5 => 76,
        Numpad6 => 77,
        Numpad7 => 71,
        Numpad8 => 72,
        Numpad9 => 73,
        Numpad0 => 82,
        NumpadDecimal => 83, // KEY_KPDOT

        ContextMenu => 127, // KEY_COMPOSE

        ControlLeft => 29,
        ShiftLeft => 42,
        AltLeft => 56,
        MetaLeft => 125,
        ControlRight => 97,
        ShiftRight => 54,
        AltRight => 100,
        MetaRight => 126,
    }
}
