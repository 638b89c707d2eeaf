//! The mapping table: what each controller input does on the PC.
//!
//! A [`MappingTable`] is built once (from the built-in profile or a profile in
//! the config file) and then frozen into a [`MappingView`], a cheap `Arc`
//! snapshot that the translator borrows for every reading.  Nothing mutates a
//! table after it has been handed out; a new profile is a new view.
//!
//! # Lookup rules
//!
//! - A button with no entry does nothing.
//! - A thumbstick is either four directional bindings or pointer motion,
//!   never both.
//! - A trigger fires its action once its value rises above its threshold.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::hid::HidKeyCode;
use crate::protocol::reading::GamepadButton;

/// Errors raised while building mapping entries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("unknown action name: {0:?}")]
    UnknownAction(String),
    #[error("trigger threshold {0} is outside (0, 1]")]
    InvalidThreshold(f32),
    #[error("pointer sensitivity {0} is outside (0, {max}]", max = MAX_POINTER_SENSITIVITY)]
    InvalidSensitivity(f32),
}

/// Largest pointer sensitivity: pixels per reading at full deflection.
pub const MAX_POINTER_SENSITIVITY: f32 = 1000.0;

// ── Actions ───────────────────────────────────────────────────────────────────

/// A mouse button the translator can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

impl PointerButton {
    fn name(self) -> &'static str {
        match self {
            PointerButton::Left => "left",
            PointerButton::Right => "right",
            PointerButton::Middle => "middle",
        }
    }
}

/// The target of a binding: a keyboard key or a mouse button.
///
/// In profile files an action is written as a HID key name (`"Enter"`,
/// `"KeyW"`) or as `"mouse:left"`, `"mouse:right"`, `"mouse:middle"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ButtonAction {
    Key(HidKeyCode),
    Pointer(PointerButton),
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Key(key) => write!(f, "{key:?}"),
            ButtonAction::Pointer(button) => write!(f, "mouse:{}", button.name()),
        }
    }
}

impl FromStr for ButtonAction {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(button) = s.strip_prefix("mouse:") {
            return match button {
                "left" => Ok(ButtonAction::Pointer(PointerButton::Left)),
                "right" => Ok(ButtonAction::Pointer(PointerButton::Right)),
                "middle" => Ok(ButtonAction::Pointer(PointerButton::Middle)),
                _ => Err(MappingError::UnknownAction(s.to_string())),
            };
        }
        HidKeyCode::ALL
            .into_iter()
            .find(|key| format!("{key:?}") == s)
            .map(ButtonAction::Key)
            .ok_or_else(|| MappingError::UnknownAction(s.to_string()))
    }
}

impl TryFrom<String> for ButtonAction {
    type Error = MappingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ButtonAction> for String {
    fn from(action: ButtonAction) -> Self {
        action.to_string()
    }
}

impl From<HidKeyCode> for ButtonAction {
    fn from(key: HidKeyCode) -> Self {
        ButtonAction::Key(key)
    }
}

impl From<PointerButton> for ButtonAction {
    fn from(button: PointerButton) -> Self {
        ButtonAction::Pointer(button)
    }
}

// ── Thumbsticks and triggers ──────────────────────────────────────────────────

/// Which thumbstick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stick {
    Left,
    Right,
}

/// Which analog trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Left,
    Right,
}

/// How one thumbstick is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThumbstickMapping {
    /// Each direction acts like a button.  `None` directions are unbound.
    DigitalEmulation {
        up: Option<ButtonAction>,
        down: Option<ButtonAction>,
        left: Option<ButtonAction>,
        right: Option<ButtonAction>,
    },
    /// Deflection moves the pointer by up to `sensitivity` pixels per reading.
    PointerMotion { sensitivity: f32 },
}

impl ThumbstickMapping {
    /// Four directional key bindings.
    pub fn keys(up: HidKeyCode, down: HidKeyCode, left: HidKeyCode, right: HidKeyCode) -> Self {
        ThumbstickMapping::DigitalEmulation {
            up: Some(up.into()),
            down: Some(down.into()),
            left: Some(left.into()),
            right: Some(right.into()),
        }
    }

    /// Pointer motion scaled by `sensitivity`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidSensitivity`] unless
    /// `0 < sensitivity <= MAX_POINTER_SENSITIVITY`.
    pub fn pointer(sensitivity: f32) -> Result<Self, MappingError> {
        if sensitivity > 0.0 && sensitivity <= MAX_POINTER_SENSITIVITY {
            Ok(ThumbstickMapping::PointerMotion { sensitivity })
        } else {
            Err(MappingError::InvalidSensitivity(sensitivity))
        }
    }
}

/// A trigger bound to an action with a press threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerMapping {
    pub action: ButtonAction,
    pub threshold: f32,
}

impl TriggerMapping {
    /// Threshold used when a profile gives none.
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    /// # Errors
    ///
    /// Returns [`MappingError::InvalidThreshold`] unless `0 < threshold <= 1`.
    pub fn new(action: ButtonAction, threshold: f32) -> Result<Self, MappingError> {
        if threshold > 0.0 && threshold <= 1.0 {
            Ok(Self { action, threshold })
        } else {
            Err(MappingError::InvalidThreshold(threshold))
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Every binding of one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable {
    buttons: BTreeMap<GamepadButton, ButtonAction>,
    left_stick: ThumbstickMapping,
    right_stick: ThumbstickMapping,
    left_trigger: Option<TriggerMapping>,
    right_trigger: Option<TriggerMapping>,
}

impl MappingTable {
    /// A table where nothing is bound.
    pub fn empty() -> Self {
        let unbound = ThumbstickMapping::DigitalEmulation {
            up: None,
            down: None,
            left: None,
            right: None,
        };
        Self {
            buttons: BTreeMap::new(),
            left_stick: unbound,
            right_stick: unbound,
            left_trigger: None,
            right_trigger: None,
        }
    }

    /// Returns the action bound to `button`, if any.
    pub fn button(&self, button: GamepadButton) -> Option<ButtonAction> {
        self.buttons.get(&button).copied()
    }

    /// Binds `button` to `action`, or unbinds it with `None`.
    pub fn set_button(&mut self, button: GamepadButton, action: Option<ButtonAction>) {
        match action {
            Some(action) => {
                self.buttons.insert(button, action);
            }
            None => {
                self.buttons.remove(&button);
            }
        }
    }

    /// Iterates over the bound buttons in ascending bit order.
    pub fn buttons(&self) -> impl Iterator<Item = (GamepadButton, ButtonAction)> + '_ {
        self.buttons.iter().map(|(b, a)| (*b, *a))
    }

    pub fn stick(&self, stick: Stick) -> &ThumbstickMapping {
        match stick {
            Stick::Left => &self.left_stick,
            Stick::Right => &self.right_stick,
        }
    }

    pub fn set_stick(&mut self, stick: Stick, mapping: ThumbstickMapping) {
        match stick {
            Stick::Left => self.left_stick = mapping,
            Stick::Right => self.right_stick = mapping,
        }
    }

    pub fn trigger(&self, trigger: Trigger) -> Option<&TriggerMapping> {
        match trigger {
            Trigger::Left => self.left_trigger.as_ref(),
            Trigger::Right => self.right_trigger.as_ref(),
        }
    }

    pub fn set_trigger(&mut self, trigger: Trigger, mapping: Option<TriggerMapping>) {
        match trigger {
            Trigger::Left => self.left_trigger = mapping,
            Trigger::Right => self.right_trigger = mapping,
        }
    }

    /// Freezes the table into a shareable snapshot with the given version.
    pub fn into_view(self, version: u64) -> MappingView {
        MappingView {
            table: Arc::new(self),
            version,
        }
    }
}

impl Default for MappingTable {
    /// The built-in profile.
    ///
    /// Face buttons drive the common menu keys, the shoulders click the mouse,
    /// the left stick is WASD and the right stick is the arrow keys.
    fn default() -> Self {
        use GamepadButton::*;
        use HidKeyCode as K;

        let mut table = Self::empty();
        let bindings: [(GamepadButton, ButtonAction); 12] = [
            (Menu, K::ContextMenu.into()),
            (View, K::Tab.into()),
            (A, K::Enter.into()),
            (B, K::Escape.into()),
            (X, K::ShiftLeft.into()),
            (Y, K::ControlLeft.into()),
            (DPadUp, K::ArrowUp.into()),
            (DPadDown, K::ArrowDown.into()),
            (DPadLeft, K::ArrowLeft.into()),
            (DPadRight, K::ArrowRight.into()),
            (LeftShoulder, PointerButton::Left.into()),
            (RightShoulder, PointerButton::Right.into()),
        ];
        for (button, action) in bindings {
            table.set_button(button, Some(action));
        }
        table.left_stick = ThumbstickMapping::keys(K::KeyW, K::KeyS, K::KeyA, K::KeyD);
        table.right_stick =
            ThumbstickMapping::keys(K::ArrowUp, K::ArrowDown, K::ArrowLeft, K::ArrowRight);
        table
    }
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// An immutable, versioned snapshot of a [`MappingTable`].
///
/// Cloning a view clones an `Arc`, so sessions can hold one for their whole
/// lifetime without copying the table.
#[derive(Debug, Clone)]
pub struct MappingView {
    table: Arc<MappingTable>,
    version: u64,
}

impl MappingView {
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl std::ops::Deref for MappingView {
    type Target = MappingTable;

    fn deref(&self) -> &MappingTable {
        &self.table
    }
}

/// Holds the current [`MappingView`] and swaps in new ones.
///
/// Swapping replaces the reference; a session that already took a view keeps
/// translating against it until it ends.
#[derive(Debug)]
pub struct MappingStore {
    current: RwLock<MappingView>,
}

impl MappingStore {
    /// Creates a store whose first view has version 1.
    pub fn new(table: MappingTable) -> Self {
        Self {
            current: RwLock::new(table.into_view(1)),
        }
    }

    /// Returns the current snapshot.
    pub fn current(&self) -> MappingView {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Installs `table` as the next version and returns its snapshot.
    pub fn replace(&self, table: MappingTable) -> MappingView {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = table.into_view(guard.version + 1);
        tracing::debug!(version = next.version, "mapping table replaced");
        *guard = next.clone();
        next
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Actions ───────────────────────────────────────────────────────────────

    #[test]
    fn test_action_parses_key_names() {
        assert_eq!("Enter".parse::<ButtonAction>(), Ok(ButtonAction::Key(HidKeyCode::Enter)));
        assert_eq!("KeyW".parse::<ButtonAction>(), Ok(ButtonAction::Key(HidKeyCode::KeyW)));
    }

    #[test]
    fn test_action_parses_mouse_buttons() {
        assert_eq!("mouse:left".parse::<ButtonAction>(), Ok(ButtonAction::Pointer(PointerButton::Left)));
        assert_eq!("mouse:middle".parse::<ButtonAction>(), Ok(ButtonAction::Pointer(PointerButton::Middle)));
    }

    #[test]
    fn test_action_rejects_unknown_names() {
        assert!("mouse:back".parse::<ButtonAction>().is_err());
        assert!("NotAKey".parse::<ButtonAction>().is_err());
    }

    #[test]
    fn test_action_display_parses_back() {
        for action in [
            ButtonAction::Key(HidKeyCode::ArrowLeft),
            ButtonAction::Pointer(PointerButton::Right),
        ] {
            assert_eq!(action.to_string().parse::<ButtonAction>(), Ok(action));
        }
    }

    // ── Builders ──────────────────────────────────────────────────────────────

    #[test]
    fn test_pointer_rejects_non_positive_sensitivity() {
        assert!(ThumbstickMapping::pointer(0.0).is_err());
        assert!(ThumbstickMapping::pointer(-3.0).is_err());
        assert!(ThumbstickMapping::pointer(f32::NAN).is_err());
        assert!(ThumbstickMapping::pointer(10.0).is_ok());
    }

    #[test]
    fn test_pointer_sensitivity_upper_bound_is_inclusive() {
        assert!(ThumbstickMapping::pointer(MAX_POINTER_SENSITIVITY).is_ok());
        assert!(ThumbstickMapping::pointer(MAX_POINTER_SENSITIVITY + 1.0).is_err());
        assert!(ThumbstickMapping::pointer(50_000.0).is_err());
        assert!(ThumbstickMapping::pointer(f32::INFINITY).is_err());
    }

    #[test]
    fn test_trigger_threshold_bounds() {
        let action = ButtonAction::Key(HidKeyCode::Space);
        assert!(TriggerMapping::new(action, 0.0).is_err());
        assert!(TriggerMapping::new(action, 1.01).is_err());
        assert!(TriggerMapping::new(action, 1.0).is_ok());
    }

    // ── Default profile ───────────────────────────────────────────────────────

    #[test]
    fn test_default_profile_binds_face_buttons() {
        let table = MappingTable::default();
        assert_eq!(table.button(GamepadButton::A), Some(HidKeyCode::Enter.into()));
        assert_eq!(table.button(GamepadButton::B), Some(HidKeyCode::Escape.into()));
        assert_eq!(table.button(GamepadButton::View), Some(HidKeyCode::Tab.into()));
    }

    #[test]
    fn test_default_profile_shoulders_are_mouse_buttons() {
        let table = MappingTable::default();
        assert_eq!(
            table.button(GamepadButton::LeftShoulder),
            Some(ButtonAction::Pointer(PointerButton::Left))
        );
        assert_eq!(
            table.button(GamepadButton::RightShoulder),
            Some(ButtonAction::Pointer(PointerButton::Right))
        );
    }

    #[test]
    fn test_default_profile_leaves_paddles_and_triggers_unbound() {
        let table = MappingTable::default();
        assert_eq!(table.button(GamepadButton::Paddle1), None);
        assert_eq!(table.button(GamepadButton::LeftThumbstick), None);
        assert!(table.trigger(Trigger::Left).is_none());
        assert!(table.trigger(Trigger::Right).is_none());
    }

    #[test]
    fn test_default_profile_left_stick_is_wasd() {
        let table = MappingTable::default();
        assert_eq!(
            *table.stick(Stick::Left),
            ThumbstickMapping::keys(
                HidKeyCode::KeyW,
                HidKeyCode::KeyS,
                HidKeyCode::KeyA,
                HidKeyCode::KeyD
            )
        );
    }

    #[test]
    fn test_set_button_none_unbinds() {
        let mut table = MappingTable::default();
        table.set_button(GamepadButton::A, None);
        assert_eq!(table.button(GamepadButton::A), None);
    }

    // ── Store ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_store_replace_bumps_version_and_keeps_old_view_intact() {
        // Arrange
        let store = MappingStore::new(MappingTable::default());
        let before = store.current();

        // Act
        let after = store.replace(MappingTable::empty());

        // Assert
        assert_eq!(before.version(), 1);
        assert_eq!(after.version(), 2);
        assert_eq!(before.button(GamepadButton::A), Some(HidKeyCode::Enter.into()));
        assert_eq!(store.current().button(GamepadButton::A), None);
    }
}
