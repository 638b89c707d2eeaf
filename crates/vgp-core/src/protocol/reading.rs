//! The decoded gamepad snapshot and the controller button set.
//!
//! # Button bits (for beginners)
//!
//! A controller reports its buttons as a *bitmask*: one bit per physical
//! button, so a single `u32` describes every button at once.  The bit values
//! follow the `Windows.Gaming.Input.GamepadButtons` layout, which is what the
//! phone-side client reads from its own gamepad API and forwards unchanged:
//!
//! | Button          | Bit       |
//! |-----------------|-----------|
//! | Menu            | 0x0000_01 |
//! | View            | 0x0000_02 |
//! | A / B / X / Y   | 0x04 .. 0x20 |
//! | D-pad           | 0x40 .. 0x200 |
//! | Shoulders       | 0x400, 0x800 |
//! | Thumbstick clicks | 0x1000, 0x2000 |
//! | Paddles 1-4     | 0x4000 .. 0x20000 |
//!
//! Every message carries two masks.  `buttons_down` lists buttons that went
//! down, `buttons_up` lists buttons that were released.  A button can never be
//! in both masks of one well-formed message.

use serde::{Deserialize, Serialize};

/// A logical controller button.
///
/// The discriminant is the button's bit in [`GamepadButtons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GamepadButton {
    Menu = 0x0000_0001,
    View = 0x0000_0002,
    A = 0x0000_0004,
    B = 0x0000_0008,
    X = 0x0000_0010,
    Y = 0x0000_0020,
    DPadUp = 0x0000_0040,
    DPadDown = 0x0000_0080,
    DPadLeft = 0x0000_0100,
    DPadRight = 0x0000_0200,
    LeftShoulder = 0x0000_0400,
    RightShoulder = 0x0000_0800,
    LeftThumbstick = 0x0000_1000,
    RightThumbstick = 0x0000_2000,
    Paddle1 = 0x0000_4000,
    Paddle2 = 0x0000_8000,
    Paddle3 = 0x0001_0000,
    Paddle4 = 0x0002_0000,
}

impl GamepadButton {
    /// Every defined button, in ascending bit order.
    ///
    /// The translator walks this list, so commands for several buttons in one
    /// reading always come out in this order.
    pub const ALL: [GamepadButton; 18] = [
        GamepadButton::Menu,
        GamepadButton::View,
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
        GamepadButton::DPadUp,
        GamepadButton::DPadDown,
        GamepadButton::DPadLeft,
        GamepadButton::DPadRight,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::LeftThumbstick,
        GamepadButton::RightThumbstick,
        GamepadButton::Paddle1,
        GamepadButton::Paddle2,
        GamepadButton::Paddle3,
        GamepadButton::Paddle4,
    ];

    /// Returns the bit this button occupies in a [`GamepadButtons`] mask.
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Returns `true` for the four D-pad directions.
    pub fn is_dpad(self) -> bool {
        matches!(
            self,
            GamepadButton::DPadUp
                | GamepadButton::DPadDown
                | GamepadButton::DPadLeft
                | GamepadButton::DPadRight
        )
    }
}

/// A set of [`GamepadButton`]s packed into a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GamepadButtons(pub u32);

impl GamepadButtons {
    /// Union of every defined button bit.
    pub const DEFINED: u32 = 0x0003_FFFF;

    /// The empty set.
    pub const NONE: GamepadButtons = GamepadButtons(0);

    /// Returns `true` if `button` is in the set.
    pub fn contains(self, button: GamepadButton) -> bool {
        self.0 & button.bit() != 0
    }

    /// Adds `button` to the set.
    pub fn insert(&mut self, button: GamepadButton) {
        self.0 |= button.bit();
    }

    /// Removes `button` from the set.
    pub fn remove(&mut self, button: GamepadButton) {
        self.0 &= !button.bit();
    }

    /// Returns `true` if no button is in the set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the bits that do not belong to any defined button.
    pub fn undefined_bits(self) -> u32 {
        self.0 & !Self::DEFINED
    }

    /// Iterates over the buttons in the set in ascending bit order.
    pub fn iter(self) -> impl Iterator<Item = GamepadButton> {
        GamepadButton::ALL
            .into_iter()
            .filter(move |b| self.contains(*b))
    }
}

impl From<GamepadButton> for GamepadButtons {
    fn from(button: GamepadButton) -> Self {
        GamepadButtons(button.bit())
    }
}

impl FromIterator<GamepadButton> for GamepadButtons {
    fn from_iter<I: IntoIterator<Item = GamepadButton>>(iter: I) -> Self {
        let mut set = GamepadButtons::NONE;
        for b in iter {
            set.insert(b);
        }
        set
    }
}

/// One decoded snapshot of the remote controller.
///
/// Triggers are in `[0, 1]`; stick axes are in `[-1, 1]` with positive X to the
/// right and positive Y pointing up.  The decoder guarantees
/// `buttons_down & buttons_up == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GamepadReading {
    pub buttons_down: GamepadButtons,
    pub buttons_up: GamepadButtons,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,
}

impl GamepadReading {
    /// Builds a reading where `pressed` went down and everything else is neutral.
    pub fn pressing(pressed: impl Into<GamepadButtons>) -> Self {
        Self {
            buttons_down: pressed.into(),
            ..Self::default()
        }
    }

    /// Builds a reading where `released` came up and everything else is neutral.
    pub fn releasing(released: impl Into<GamepadButtons>) -> Self {
        Self {
            buttons_up: released.into(),
            ..Self::default()
        }
    }
}
