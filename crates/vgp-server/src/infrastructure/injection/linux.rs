//! Linux injection through `uinput` virtual devices.
//!
//! # What is uinput? (for beginners)
//!
//! `/dev/uinput` lets a process register a brand-new input device with the
//! kernel.  Once created, the device shows up next to the physical ones under
//! `/dev/input/event*`, and everything above the kernel (X11, Wayland
//! compositors, SDL, Steam, browsers' Gamepad API) reads it exactly like real
//! hardware.  That makes it work on every desktop, unlike XTest which only
//! reaches X11 clients.
//!
//! The backend creates up to three devices:
//!
//! | Device                       | Events                                      |
//! |------------------------------|---------------------------------------------|
//! | `Virtual Gamepad PC Keyboard`| `KEY_ESC..=KEY_COMPOSE`                     |
//! | `Virtual Gamepad PC Mouse`   | left/right/middle buttons, relative X/Y, wheels |
//! | `Virtual Gamepad PC`         | Xbox 360 layout, created in gamepad mode only   |
//!
//! Each event written to a device becomes visible to readers at the next
//! `SYN_REPORT`.  Keyboard and mouse events are synced one by one; the gamepad
//! stages changes and syncs them together on [`VirtualGamepad::commit`].
//!
//! # Permissions
//!
//! Opening `/dev/uinput` normally requires membership of the `input` group (or
//! a udev rule) and the `uinput` kernel module.  Creation failures are reported
//! as [`InjectionError::Device`] with a hint in the log.
//!
//! Dropping a `UInputDevice` destroys it, so the devices disappear from the
//! system when the backend is dropped.

#![cfg(target_os = "linux")]

use std::io;

use evdev_rs::enums::{int_to_ev_key, EventCode, EV_ABS, EV_KEY, EV_REL, EV_SYN};
use evdev_rs::{AbsInfo, DeviceWrapper, EnableCodeData, InputEvent, TimeVal, UInputDevice, UninitDevice};
use tracing::{debug, error, info};
use vgp_core::keymap::linux_evdev::{KEY_CODE_MAX, KEY_CODE_MIN};
use vgp_core::keymap::KeyMapper;
use vgp_core::{GamepadAxis, GamepadButton, GamepadButtons, HidKeyCode, OutputMode, PointerButton};

use crate::application::inject::{InjectionBackend, InjectionError, VirtualGamepad};

// ── Device identities ─────────────────────────────────────────────────────────

const BUS_USB: u16 = 0x03;
const BUS_VIRTUAL: u16 = 0x06;

const KEYBOARD_NAME: &str = "Virtual Gamepad PC Keyboard";
const MOUSE_NAME: &str = "Virtual Gamepad PC Mouse";
const GAMEPAD_NAME: &str = "Virtual Gamepad PC";

/// Linux Foundation vendor id, used for the keyboard and mouse.
const VIRTUAL_VENDOR: u16 = 0x1d6b;
const KEYBOARD_PRODUCT: u16 = 0x0001;
const MOUSE_PRODUCT: u16 = 0x0002;

/// Microsoft Xbox 360 controller; games and SDL ship mappings for it.
const GAMEPAD_VENDOR: u16 = 0x045e;
const GAMEPAD_PRODUCT: u16 = 0x028e;
const GAMEPAD_VERSION: u16 = 0x0110;

// ── Axis ranges ───────────────────────────────────────────────────────────────

const STICK_MAX: i32 = 32767;
const STICK_MIN: i32 = -32768;
const TRIGGER_MAX: i32 = 255;

const STICK_ABSINFO: AbsInfo = AbsInfo {
    value: 0,
    minimum: STICK_MIN,
    maximum: STICK_MAX,
    fuzz: 16,
    flat: 128,
    resolution: 0,
};

const TRIGGER_ABSINFO: AbsInfo = AbsInfo {
    value: 0,
    minimum: 0,
    maximum: TRIGGER_MAX,
    fuzz: 0,
    flat: 0,
    resolution: 0,
};

const HAT_ABSINFO: AbsInfo = AbsInfo {
    value: 0,
    minimum: -1,
    maximum: 1,
    fuzz: 0,
    flat: 0,
    resolution: 0,
};

/// `errno` for a device that went away underneath us.
const ENODEV: i32 = 19;

// ── Backend ───────────────────────────────────────────────────────────────────

/// [`InjectionBackend`] built on `uinput` virtual devices.
pub struct UinputBackend {
    keyboard: UInputDevice,
    mouse: UInputDevice,
    gamepad: Option<UinputGamepad>,
}

impl UinputBackend {
    /// Creates the keyboard and mouse, plus the gamepad in [`OutputMode::Gamepad`].
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Device`] if any device cannot be created.
    pub fn new(mode: OutputMode) -> Result<Self, InjectionError> {
        let keyboard = create_keyboard()?;
        let mouse = create_mouse()?;
        let gamepad = match mode {
            OutputMode::Gamepad => Some(UinputGamepad::new()?),
            OutputMode::KeyboardMouse => None,
        };
        info!(gamepad = gamepad.is_some(), "uinput devices created");
        Ok(Self {
            keyboard,
            mouse,
            gamepad,
        })
    }
}

impl InjectionBackend for UinputBackend {
    fn key_down(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        write_synced(&self.keyboard, &[(key_code(key)?, 1)])
    }

    fn key_up(&mut self, key: HidKeyCode) -> Result<(), InjectionError> {
        write_synced(&self.keyboard, &[(key_code(key)?, 0)])
    }

    fn pointer_move_by(&mut self, dx: i32, dy: i32) -> Result<(), InjectionError> {
        let mut events = Vec::with_capacity(2);
        if dx != 0 {
            events.push((EventCode::EV_REL(EV_REL::REL_X), dx));
        }
        if dy != 0 {
            events.push((EventCode::EV_REL(EV_REL::REL_Y), dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        write_synced(&self.mouse, &events)
    }

    fn pointer_button_down(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        write_synced(&self.mouse, &[(pointer_code(button), 1)])
    }

    fn pointer_button_up(&mut self, button: PointerButton) -> Result<(), InjectionError> {
        write_synced(&self.mouse, &[(pointer_code(button), 0)])
    }

    fn scroll(&mut self, delta: i32) -> Result<(), InjectionError> {
        if delta == 0 {
            return Ok(());
        }
        write_synced(&self.mouse, &[(EventCode::EV_REL(EV_REL::REL_WHEEL), delta)])
    }

    fn gamepad(&mut self) -> Option<&mut dyn VirtualGamepad> {
        self.gamepad.as_mut().map(|g| g as &mut dyn VirtualGamepad)
    }
}

impl Drop for UinputBackend {
    fn drop(&mut self) {
        info!("removing uinput devices");
    }
}

// ── Gamepad ───────────────────────────────────────────────────────────────────

/// An Xbox 360 style controller with staged reports.
pub struct UinputGamepad {
    device: UInputDevice,
    pending: Vec<(EventCode, i32)>,
    dpad: GamepadButtons,
}

impl UinputGamepad {
    fn new() -> Result<Self, InjectionError> {
        let dev = new_device(GAMEPAD_NAME, BUS_USB, GAMEPAD_VENDOR, GAMEPAD_PRODUCT)?;
        dev.set_version(GAMEPAD_VERSION);

        for button in GamepadButton::ALL {
            enable(&dev, EventCode::EV_KEY(gamepad_button_code(button)), None)?;
        }
        enable(&dev, EventCode::EV_KEY(EV_KEY::BTN_MODE), None)?;

        for abs in [EV_ABS::ABS_X, EV_ABS::ABS_Y, EV_ABS::ABS_RX, EV_ABS::ABS_RY] {
            enable(&dev, EventCode::EV_ABS(abs), Some(EnableCodeData::AbsInfo(STICK_ABSINFO)))?;
        }
        for abs in [EV_ABS::ABS_Z, EV_ABS::ABS_RZ] {
            enable(&dev, EventCode::EV_ABS(abs), Some(EnableCodeData::AbsInfo(TRIGGER_ABSINFO)))?;
        }
        for abs in [EV_ABS::ABS_HAT0X, EV_ABS::ABS_HAT0Y] {
            enable(&dev, EventCode::EV_ABS(abs), Some(EnableCodeData::AbsInfo(HAT_ABSINFO)))?;
        }

        let device = UInputDevice::create_from_device(&dev).map_err(|e| creation_error(GAMEPAD_NAME, e))?;
        debug!(name = GAMEPAD_NAME, "virtual gamepad created");
        Ok(Self {
            device,
            pending: Vec::new(),
            dpad: GamepadButtons::NONE,
        })
    }
}

impl VirtualGamepad for UinputGamepad {
    fn set_button(&mut self, button: GamepadButton, pressed: bool) -> Result<(), InjectionError> {
        self.pending
            .push((EventCode::EV_KEY(gamepad_button_code(button)), pressed as i32));

        if button.is_dpad() {
            if pressed {
                self.dpad.insert(button);
            } else {
                self.dpad.remove(button);
            }
            let (x, y) = hat_values(self.dpad);
            self.pending.push((EventCode::EV_ABS(EV_ABS::ABS_HAT0X), x));
            self.pending.push((EventCode::EV_ABS(EV_ABS::ABS_HAT0Y), y));
        }
        Ok(())
    }

    fn set_axis(&mut self, axis: GamepadAxis, value: f32) -> Result<(), InjectionError> {
        let (abs, raw) = match axis {
            GamepadAxis::LeftStickX => (EV_ABS::ABS_X, stick_value(value)),
            GamepadAxis::LeftStickY => (EV_ABS::ABS_Y, stick_value(-value)),
            GamepadAxis::RightStickX => (EV_ABS::ABS_RX, stick_value(value)),
            GamepadAxis::RightStickY => (EV_ABS::ABS_RY, stick_value(-value)),
            GamepadAxis::LeftTrigger => (EV_ABS::ABS_Z, trigger_value(value)),
            GamepadAxis::RightTrigger => (EV_ABS::ABS_RZ, trigger_value(value)),
        };
        self.pending.push((EventCode::EV_ABS(abs), raw));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), InjectionError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let result = write_synced(&self.device, &self.pending);
        self.pending.clear();
        result
    }
}

// ── Device construction ───────────────────────────────────────────────────────

fn new_device(name: &str, bus: u16, vendor: u16, product: u16) -> Result<UninitDevice, InjectionError> {
    let dev = UninitDevice::new()
        .ok_or_else(|| InjectionError::Device(format!("{name}: libevdev allocation failed")))?;
    dev.set_name(name);
    dev.set_bustype(bus);
    dev.set_vendor_id(vendor);
    dev.set_product_id(product);
    Ok(dev)
}

fn create_keyboard() -> Result<UInputDevice, InjectionError> {
    let dev = new_device(KEYBOARD_NAME, BUS_VIRTUAL, VIRTUAL_VENDOR, KEYBOARD_PRODUCT)?;
    for code in KEY_CODE_MIN..=KEY_CODE_MAX {
        if let Some(key) = int_to_ev_key(u32::from(code)) {
            enable(&dev, EventCode::EV_KEY(key), None)?;
        }
    }
    UInputDevice::create_from_device(&dev).map_err(|e| creation_error(KEYBOARD_NAME, e))
}

fn create_mouse() -> Result<UInputDevice, InjectionError> {
    let dev = new_device(MOUSE_NAME, BUS_VIRTUAL, VIRTUAL_VENDOR, MOUSE_PRODUCT)?;
    for button in [PointerButton::Left, PointerButton::Right, PointerButton::Middle] {
        enable(&dev, pointer_code(button), None)?;
    }
    for rel in [EV_REL::REL_X, EV_REL::REL_Y, EV_REL::REL_WHEEL, EV_REL::REL_HWHEEL] {
        enable(&dev, EventCode::EV_REL(rel), None)?;
    }
    UInputDevice::create_from_device(&dev).map_err(|e| creation_error(MOUSE_NAME, e))
}

fn enable(
    dev: &UninitDevice,
    code: EventCode,
    data: Option<EnableCodeData>,
) -> Result<(), InjectionError> {
    dev.enable_event_code(&code, data)
        .map_err(|e| InjectionError::Device(format!("cannot enable {code:?}: {e}")))
}

fn creation_error(name: &str, e: io::Error) -> InjectionError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => error!(
            "permission denied creating {name}; add the user to the `input` group \
             or install a udev rule for /dev/uinput"
        ),
        io::ErrorKind::NotFound => error!("/dev/uinput is missing; load the module with `modprobe uinput`"),
        _ => error!("cannot create {name}: {e}"),
    }
    InjectionError::Device(format!("{name}: {e}"))
}

// ── Event writing ─────────────────────────────────────────────────────────────

/// Writes `events` followed by one `SYN_REPORT`.
fn write_synced(device: &UInputDevice, events: &[(EventCode, i32)]) -> Result<(), InjectionError> {
    for (code, value) in events {
        write(device, code.clone(), *value)?;
    }
    write(device, EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0)
}

fn write(device: &UInputDevice, event_code: EventCode, value: i32) -> Result<(), InjectionError> {
    let event = InputEvent {
        event_code,
        value,
        time: TimeVal {
            tv_sec: 0,
            tv_usec: 0,
        },
    };
    device.write_event(&event).map_err(|e| {
        if e.raw_os_error() == Some(ENODEV) {
            InjectionError::Device(format!("virtual device disappeared: {e}"))
        } else {
            InjectionError::Event(format!("write {:?}: {e}", event.event_code))
        }
    })
}

// ── Code tables ───────────────────────────────────────────────────────────────

fn key_code(key: HidKeyCode) -> Result<EventCode, InjectionError> {
    int_to_ev_key(u32::from(KeyMapper::hid_to_linux_evdev(key)))
        .map(EventCode::EV_KEY)
        .ok_or(InjectionError::UnmappedKey(key))
}

fn pointer_code(button: PointerButton) -> EventCode {
    EventCode::EV_KEY(match button {
        PointerButton::Left => EV_KEY::BTN_LEFT,
        PointerButton::Right => EV_KEY::BTN_RIGHT,
        PointerButton::Middle => EV_KEY::BTN_MIDDLE,
    })
}

/// Kernel button codes in the layout `xpad` uses for the Xbox 360 pad.
fn gamepad_button_code(button: GamepadButton) -> EV_KEY {
    match button {
        GamepadButton::Menu => EV_KEY::BTN_START,
        GamepadButton::View => EV_KEY::BTN_SELECT,
        GamepadButton::A => EV_KEY::BTN_SOUTH,
        GamepadButton::B => EV_KEY::BTN_EAST,
        // BTN_X and BTN_Y alias NORTH and WEST in the kernel headers.
        GamepadButton::X => EV_KEY::BTN_NORTH,
        GamepadButton::Y => EV_KEY::BTN_WEST,
        GamepadButton::DPadUp => EV_KEY::BTN_DPAD_UP,
        GamepadButton::DPadDown => EV_KEY::BTN_DPAD_DOWN,
        GamepadButton::DPadLeft => EV_KEY::BTN_DPAD_LEFT,
        GamepadButton::DPadRight => EV_KEY::BTN_DPAD_RIGHT,
        GamepadButton::LeftShoulder => EV_KEY::BTN_TL,
        GamepadButton::RightShoulder => EV_KEY::BTN_TR,
        GamepadButton::LeftThumbstick => EV_KEY::BTN_THUMBL,
        GamepadButton::RightThumbstick => EV_KEY::BTN_THUMBR,
        GamepadButton::Paddle1 => EV_KEY::BTN_TRIGGER_HAPPY1,
        GamepadButton::Paddle2 => EV_KEY::BTN_TRIGGER_HAPPY2,
        GamepadButton::Paddle3 => EV_KEY::BTN_TRIGGER_HAPPY3,
        GamepadButton::Paddle4 => EV_KEY::BTN_TRIGGER_HAPPY4,
    }
}

/// Maps `[-1, 1]` onto the stick range.
fn stick_value(value: f32) -> i32 {
    (value.clamp(-1.0, 1.0) * STICK_MAX as f32).round() as i32
}

/// Maps `[0, 1]` onto the trigger range.
fn trigger_value(value: f32) -> i32 {
    (value.clamp(0.0, 1.0) * TRIGGER_MAX as f32).round() as i32
}

/// Hat position for the held d-pad buttons; hat Y is positive downward.
fn hat_values(dpad: GamepadButtons) -> (i32, i32) {
    let axis = |neg: GamepadButton, pos: GamepadButton| {
        i32::from(dpad.contains(pos)) - i32::from(dpad.contains(neg))
    };
    (
        axis(GamepadButton::DPadLeft, GamepadButton::DPadRight),
        axis(GamepadButton::DPadUp, GamepadButton::DPadDown),
    )
}
