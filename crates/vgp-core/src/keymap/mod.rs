//! Key code translation tables.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07, Keyboard/Keypad).
//! Profiles and injection commands carry HID codes; each injection backend
//! translates them to native codes when it synthesizes the event.

pub mod hid;
pub mod linux_evdev;
pub mod windows_vk;

pub use hid::HidKeyCode;
pub use windows_vk::WindowsKey;

/// Unified key mapper providing every native translation.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a [`HidKeyCode`] to a Windows Virtual Key and its extended flag.
    pub fn hid_to_windows_vk(hid: HidKeyCode) -> WindowsKey {
        windows_vk::hid_to_vk(hid)
    }

    /// Translates a [`HidKeyCode`] to a Linux `KEY_*` input-event code.
    pub fn hid_to_linux_evdev(hid: HidKeyCode) -> u16 {
        linux_evdev::hid_to_evdev(hid)
    }
}
