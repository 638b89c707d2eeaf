//! USB HID Usage ID to Windows Virtual Key (VK) translation.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h) and USB HID Usage Tables 1.3.
//!
//! # Extended keys (for beginners)
//!
//! Some keys exist twice on a full keyboard: Enter and Numpad Enter, the
//! arrow cluster and the numpad arrows, left and right Ctrl.  Windows gives
//! both copies the same VK code and tells them apart with the *extended* flag
//! (the `0xE0` scan-code prefix on real hardware).  When `SendInput` injects a
//! scan code it must set `KEYEVENTF_EXTENDEDKEY` for the extended copy, or the
//! target application sees the other key: an injected Up arrow without the
//! flag arrives as Numpad 8.
//!
//! [`hid_to_vk`] therefore returns a [`WindowsKey`] carrying both the VK code
//! and whether the extended flag is required.

use super::hid::HidKeyCode;

/// A Windows Virtual Key together with its extended-key requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsKey {
    pub vk: u8,
    pub extended: bool,
}

/// VK codes that always need `KEYEVENTF_EXTENDEDKEY` when injected by scan code.
const EXTENDED_VKS: &[u8] = &[
    0x03, // VK_CANCEL (Ctrl+Break)
    0x21, 0x22, 0x23, 0x24, // PageUp, PageDown, End, Home
    0x25, 0x26, 0x27, 0x28, // arrows
    0x2C, // VK_SNAPSHOT
    0x2D, 0x2E, // Insert, Delete
    0x5B, 0x5C, 0x5D, // Win keys, Apps
    0x6F, // VK_DIVIDE
    0x90, // VK_NUMLOCK
    0xA3, 0xA5, // Right Ctrl, Right Alt
];

/// Returns `true` if `vk` is injected with the extended-key flag.
pub fn is_extended_vk(vk: u8) -> bool {
    EXTENDED_VKS.contains(&vk)
}

/// Translates a HID Usage ID to the Windows key that produces it.
///
/// Total over [`HidKeyCode`]: a new HID variant does not compile until it has
/// a VK code here.
pub fn hid_to_vk(hid: HidKeyCode) -> WindowsKey {
    use HidKeyCode::*;

    let vk: u8 = match hid {
        // ── Alphabet keys (VK_A=0x41 … VK_Z=0x5A) ────────────────────────────
        KeyA => 0x41,
        KeyB => 0x42,
        KeyC => 0x43,
        KeyD => 0x44,
        KeyE => 0x45,
        KeyF => 0x46,
        KeyG => 0x47,
        KeyH => 0x48,
        KeyI => 0x49,
        KeyJ => 0x4A,
        KeyK => 0x4B,
        KeyL => 0x4C,
        KeyM => 0x4D,
        KeyN => 0x4E,
        KeyO => 0x4F,
        KeyP => 0x50,
        KeyQ => 0x51,
        KeyR => 0x52,
        KeyS => 0x53,
        KeyT => 0x54,
        KeyU => 0x55,
        KeyV => 0x56,
        KeyW => 0x57,
        KeyX => 0x58,
        KeyY => 0x59,
        KeyZ => 0x5A,

        // ── Digit row (VK_0=0x30 … VK_9=0x39) ────────────────────────────────
        Digit0 => 0x30,
        Digit1 => 0x31,
        Digit2 => 0x32,
        Digit3 => 0x33,
        Digit4 => 0x34,
        Digit5 => 0x35,
        Digit6 => 0x36,
        Digit7 => 0x37,
        Digit8 => 0x38,
        Digit9 => 0x39,

        // ── Control keys ─────────────────────────────────────────────────────
        Enter => 0x0D,       // VK_RETURN
        Escape => 0x1B,      // VK_ESCAPE
        Backspace => 0x08,   // VK_BACK
        Tab => 0x09,         // VK_TAB
        Space => 0x20,       // VK_SPACE
        CapsLock => 0x14,    // VK_CAPITAL
        ScrollLock => 0x91,  // VK_SCROLL
        Pause => 0x13,       // VK_PAUSE
        Insert => 0x2D,      // VK_INSERT
        Home => 0x24,        // VK_HOME
        PageUp => 0x21,      // VK_PRIOR
        Delete => 0x2E,      // VK_DELETE
        End => 0x23,         // VK_END
        PageDown => 0x22,    // VK_NEXT
        PrintScreen => 0x2C, // VK_SNAPSHOT
        ContextMenu => 0x5D, // VK_APPS

        // ── Arrow keys ───────────────────────────────────────────────────────
        ArrowLeft => 0x25,
        ArrowUp => 0x26,
        ArrowRight => 0x27,
        ArrowDown => 0x28,

        // ── Function keys (VK_F1=0x70 … VK_F12=0x7B) ─────────────────────────
        F1 => 0x70,
        F2 => 0x71,
        F3 => 0x72,
        F4 => 0x73,
        F5 => 0x74,
        F6 => 0x75,
        F7 => 0x76,
        F8 => 0x77,
        F9 => 0x78,
        F10 => 0x79,
        F11 => 0x7A,
        F12 => 0x7B,

        // ── Numpad ───────────────────────────────────────────────────────────
        Numpad0 => 0x60,
        Numpad1 => 0x61,
        Numpad2 => 0x62,
        Numpad3 => 0x63,
        Numpad4 => 0x64,
        Numpad5 => 0x65,
        Numpad6 => 0x66,
        Numpad7 => 0x67,
        Numpad8 => 0x68,
        Numpad9 => 0x69,
        NumpadMultiply => 0x6A,
        NumpadAdd => 0x6B,
        NumpadSubtract => 0x6D,
        NumpadDecimal => 0x6E,
        NumpadDivide => 0x6F,
        NumLock => 0x90,
        NumpadEnter => 0x0D, // VK_RETURN + extended flag

        // ── Punctuation / symbols (US layout positions) ──────────────────────
        Minus => 0xBD,        // VK_OEM_MINUS
        Equal => 0xBB,        // VK_OEM_PLUS
        BracketLeft => 0xDB,  // VK_OEM_4
        BracketRight => 0xDD, // VK_OEM_6
        Backslash => 0xDC,    // VK_OEM_5
        Semicolon => 0xBA,    // VK_OEM_1
        Quote => 0xDE,        // VK_OEM_7
        Backquote => 0xC0,    // VK_OEM_3
        Comma => 0xBC,        // VK_OEM_COMMA
        Period => 0xBE,       // VK_OEM_PERIOD
        Slash => 0xBF,        // VK_OEM_2

        // ── Modifier keys ────────────────────────────────────────────────────
        ControlLeft => 0xA2,
        ControlRight => 0xA3,
        ShiftLeft => 0xA0,
        ShiftRight => 0xA1,
        AltLeft => 0xA4,
        AltRight => 0xA5,
        MetaLeft => 0x5B,
        MetaRight => 0x5C,
    };

    WindowsKey {
        vk,
        extended: is_extended_vk(vk) || hid == NumpadEnter,
    }
}
