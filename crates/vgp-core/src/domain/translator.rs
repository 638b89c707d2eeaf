//! State translator: successive readings in, ordered injection commands out.
//!
//! # Why is this stateful? (for beginners)
//!
//! The phone sends a full snapshot many times per second.  If every snapshot
//! with "A is down" produced a key press, holding A for one second would type
//! dozens of Enters.  The translator therefore remembers what it has already
//! pressed (the [`TranslatorState`]) and only emits a command when something
//! *changes*: a button goes down or comes up, a stick leaves or re-enters the
//! deadzone, a trigger crosses its threshold.  This is called *edge detection*.
//!
//! Pointer motion is the exception: a deflected stick keeps the pointer moving
//! on every reading, so motion commands are emitted for each reading.
//!
//! # Purity
//!
//! [`translate`] never mutates its inputs and performs no I/O.  It returns the
//! commands together with the next state; the caller decides what to do with
//! both.

use serde::{Deserialize, Serialize};

use crate::domain::mapping::{
    ButtonAction, MappingTable, PointerButton, Stick, ThumbstickMapping, Trigger,
    MAX_POINTER_SENSITIVITY,
};
use crate::keymap::hid::HidKeyCode;
use crate::protocol::reading::{GamepadButton, GamepadButtons, GamepadReading};

/// Stick deflection treated as neutral when no deadzone is configured.
pub const DEFAULT_DEADZONE: f32 = 0.5;

// ── Commands ──────────────────────────────────────────────────────────────────

/// An analog control of the virtual gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamepadAxis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
}

impl GamepadAxis {
    pub const ALL: [GamepadAxis; 6] = [
        GamepadAxis::LeftStickX,
        GamepadAxis::LeftStickY,
        GamepadAxis::RightStickX,
        GamepadAxis::RightStickY,
        GamepadAxis::LeftTrigger,
        GamepadAxis::RightTrigger,
    ];

    /// Returns `true` for the two triggers, whose range is `[0, 1]`.
    pub fn is_trigger(self) -> bool {
        matches!(self, GamepadAxis::LeftTrigger | GamepadAxis::RightTrigger)
    }

    fn read(self, reading: &GamepadReading) -> f32 {
        match self {
            GamepadAxis::LeftStickX => reading.left_stick_x,
            GamepadAxis::LeftStickY => reading.left_stick_y,
            GamepadAxis::RightStickX => reading.right_stick_x,
            GamepadAxis::RightStickY => reading.right_stick_y,
            GamepadAxis::LeftTrigger => reading.left_trigger,
            GamepadAxis::RightTrigger => reading.right_trigger,
        }
    }
}

/// One unit of translated intent, independent of how the OS realizes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InjectionCommand {
    KeyDown(HidKeyCode),
    KeyUp(HidKeyCode),
    PointerButtonDown(PointerButton),
    PointerButtonUp(PointerButton),
    /// Relative pointer motion in screen coordinates (positive `dy` is down).
    PointerMoveBy { dx: i32, dy: i32 },
    GamepadButtonDown(GamepadButton),
    GamepadButtonUp(GamepadButton),
    GamepadAxisSet { axis: GamepadAxis, value: f32 },
}

impl InjectionCommand {
    /// Returns `true` for commands addressed to the virtual gamepad.
    pub fn targets_gamepad(&self) -> bool {
        matches!(
            self,
            InjectionCommand::GamepadButtonDown(_)
                | InjectionCommand::GamepadButtonUp(_)
                | InjectionCommand::GamepadAxisSet { .. }
        )
    }

    fn press(action: ButtonAction) -> Self {
        match action {
            ButtonAction::Key(key) => InjectionCommand::KeyDown(key),
            ButtonAction::Pointer(button) => InjectionCommand::PointerButtonDown(button),
        }
    }

    fn release(action: ButtonAction) -> Self {
        match action {
            ButtonAction::Key(key) => InjectionCommand::KeyUp(key),
            ButtonAction::Pointer(button) => InjectionCommand::PointerButtonUp(button),
        }
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// What the controller drives on the PC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Buttons, sticks, and triggers become keyboard and mouse input per the mapping table.
    #[default]
    KeyboardMouse,
    /// Everything is forwarded 1:1 to a virtual gamepad; the mapping table is unused.
    Gamepad,
}

/// Per-session translation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslateOptions {
    pub mode: OutputMode,
    /// Symmetric neutral band; a value whose magnitude is `<= deadzone` is neutral.
    pub deadzone: f32,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::KeyboardMouse,
            deadzone: DEFAULT_DEADZONE,
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Which side of the deadzone an axis was last seen on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisLatch {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl AxisLatch {
    fn classify(value: f32, deadzone: f32) -> Self {
        if value > deadzone {
            AxisLatch::Positive
        } else if value < -deadzone {
            AxisLatch::Negative
        } else {
            AxisLatch::Neutral
        }
    }
}

/// Directional latches for one stick in digital emulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickLatch {
    pub x: AxisLatch,
    pub y: AxisLatch,
}

/// Everything the translator remembers between readings.
///
/// `TranslatorState::default()` is the state before any message: nothing held,
/// every stick neutral, every axis at rest.  It is an ordinary state, so an
/// all-neutral reading translates to nothing whether or not it is the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatorState {
    /// The last reading accepted.
    pub previous: GamepadReading,
    /// Buttons whose press has been emitted and not yet released.
    pub held: GamepadButtons,
    pub left_stick: StickLatch,
    pub right_stick: StickLatch,
    pub left_trigger_pressed: bool,
    pub right_trigger_pressed: bool,
}

impl TranslatorState {
    /// Returns `true` if nothing is held and no axis is off its rest position.
    pub fn is_idle(&self) -> bool {
        self.held.is_empty()
            && self.left_stick == StickLatch::default()
            && self.right_stick == StickLatch::default()
            && !self.left_trigger_pressed
            && !self.right_trigger_pressed
            && GamepadAxis::ALL
                .iter()
                .all(|axis| axis.read(&self.previous) == 0.0)
    }
}

// ── Translation ───────────────────────────────────────────────────────────────

/// Translates `current` against `prev` into commands and the next state.
///
/// Unmapped inputs produce no command.  Commands come out in this order:
/// button edges (ascending button bit), left stick, right stick, left
/// trigger, right trigger.
pub fn translate(
    prev: &TranslatorState,
    current: &GamepadReading,
    mapping: &MappingTable,
    options: TranslateOptions,
) -> (Vec<InjectionCommand>, TranslatorState) {
    let mut next = prev.clone();
    let mut out = Vec::new();

    translate_buttons(&mut next, current, mapping, options.mode, &mut out);

    match options.mode {
        OutputMode::KeyboardMouse => {
            let sticks = [
                (Stick::Left, current.left_stick_x, current.left_stick_y),
                (Stick::Right, current.right_stick_x, current.right_stick_y),
            ];
            for (stick, x, y) in sticks {
                let latch = match stick {
                    Stick::Left => &mut next.left_stick,
                    Stick::Right => &mut next.right_stick,
                };
                match *mapping.stick(stick) {
                    ThumbstickMapping::DigitalEmulation { up, down, left, right } => {
                        step_axis(&mut latch.x, x, options.deadzone, left, right, &mut out);
                        step_axis(&mut latch.y, y, options.deadzone, down, up, &mut out);
                    }
                    ThumbstickMapping::PointerMotion { sensitivity } => {
                        pointer_steps(x, y, options.deadzone, sensitivity, &mut out);
                    }
                }
            }

            let triggers = [
                (Trigger::Left, current.left_trigger),
                (Trigger::Right, current.right_trigger),
            ];
            for (trigger, value) in triggers {
                let Some(binding) = mapping.trigger(trigger) else {
                    continue;
                };
                let pressed = match trigger {
                    Trigger::Left => &mut next.left_trigger_pressed,
                    Trigger::Right => &mut next.right_trigger_pressed,
                };
                let above = value > binding.threshold;
                if above != *pressed {
                    out.push(if above {
                        InjectionCommand::press(binding.action)
                    } else {
                        InjectionCommand::release(binding.action)
                    });
                    *pressed = above;
                }
            }
        }
        OutputMode::Gamepad => {
            for axis in GamepadAxis::ALL {
                let value = axis.read(current);
                if value != axis.read(&prev.previous) {
                    out.push(InjectionCommand::GamepadAxisSet { axis, value });
                }
            }
        }
    }

    next.previous = *current;
    (out, next)
}

/// Releases everything `state` holds and returns the resting state.
///
/// Used when a session ends so no key, mouse button, or gamepad control is
/// left pressed on the PC.
pub fn release_all(
    state: &TranslatorState,
    mapping: &MappingTable,
    mode: OutputMode,
) -> (Vec<InjectionCommand>, TranslatorState) {
    let mut out = Vec::new();

    match mode {
        OutputMode::KeyboardMouse => {
            for button in state.held.iter() {
                if let Some(action) = mapping.button(button) {
                    out.push(InjectionCommand::release(action));
                }
            }
            for stick in [Stick::Left, Stick::Right] {
                let latch = match stick {
                    Stick::Left => state.left_stick,
                    Stick::Right => state.right_stick,
                };
                if let ThumbstickMapping::DigitalEmulation { up, down, left, right } =
                    *mapping.stick(stick)
                {
                    let mut x = latch.x;
                    let mut y = latch.y;
                    step_axis(&mut x, 0.0, 0.0, left, right, &mut out);
                    step_axis(&mut y, 0.0, 0.0, down, up, &mut out);
                }
            }
            let triggers = [
                (Trigger::Left, state.left_trigger_pressed),
                (Trigger::Right, state.right_trigger_pressed),
            ];
            for (trigger, pressed) in triggers {
                if let (true, Some(binding)) = (pressed, mapping.trigger(trigger)) {
                    out.push(InjectionCommand::release(binding.action));
                }
            }
        }
        OutputMode::Gamepad => {
            for button in state.held.iter() {
                out.push(InjectionCommand::GamepadButtonUp(button));
            }
            for axis in GamepadAxis::ALL {
                if axis.read(&state.previous) != 0.0 {
                    out.push(InjectionCommand::GamepadAxisSet { axis, value: 0.0 });
                }
            }
        }
    }

    (out, TranslatorState::default())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn translate_buttons(
    next: &mut TranslatorState,
    current: &GamepadReading,
    mapping: &MappingTable,
    mode: OutputMode,
    out: &mut Vec<InjectionCommand>,
) {
    // A bit in both masks is a release.
    let pressed = GamepadButtons(current.buttons_down.0 & !current.buttons_up.0);
    let released = current.buttons_up;

    for button in GamepadButton::ALL {
        let held = next.held.contains(button);
        let edge_down = pressed.contains(button) && !held;
        let edge_up = released.contains(button) && held;
        if !edge_down && !edge_up {
            continue;
        }

        if edge_down {
            next.held.insert(button);
        } else {
            next.held.remove(button);
        }

        let command = match mode {
            OutputMode::Gamepad if edge_down => Some(InjectionCommand::GamepadButtonDown(button)),
            OutputMode::Gamepad => Some(InjectionCommand::GamepadButtonUp(button)),
            OutputMode::KeyboardMouse => mapping.button(button).map(|action| {
                if edge_down {
                    InjectionCommand::press(action)
                } else {
                    InjectionCommand::release(action)
                }
            }),
        };
        out.extend(command);
    }
}

/// Moves one axis latch toward the side `value` is on, releasing the old
/// direction before pressing the new one.
fn step_axis(
    latch: &mut AxisLatch,
    value: f32,
    deadzone: f32,
    negative: Option<ButtonAction>,
    positive: Option<ButtonAction>,
    out: &mut Vec<InjectionCommand>,
) {
    let target = AxisLatch::classify(value, deadzone);
    if target == *latch {
        return;
    }

    let action_for = |side: AxisLatch| match side {
        AxisLatch::Negative => negative,
        AxisLatch::Positive => positive,
        AxisLatch::Neutral => None,
    };
    if let Some(action) = action_for(*latch) {
        out.push(InjectionCommand::release(action));
    }
    if let Some(action) = action_for(target) {
        out.push(InjectionCommand::press(action));
    }
    *latch = target;
}

/// Emits the pointer motion for one stick as single-pixel steps.
///
/// The target offset is `trunc(axis * sensitivity)` per axis, zero inside the
/// deadzone, with Y flipped into screen coordinates.  It is split into
/// `max(|dx|, |dy|)` steps distributed like a Bresenham line, so the steps sum
/// to exactly `(dx, dy)` and no single event jumps more than one pixel.
///
/// Each axis offset is clamped to `MAX_POINTER_SENSITIVITY` pixels, which also
/// covers tables built by hand with an out-of-range sensitivity.
fn pointer_steps(x: f32, y: f32, deadzone: f32, sensitivity: f32, out: &mut Vec<InjectionCommand>) {
    let scaled = |v: f32| -> i64 {
        if v.abs() <= deadzone {
            0
        } else {
            // NaN casts to 0.
            (v * sensitivity)
                .trunc()
                .clamp(-MAX_POINTER_SENSITIVITY, MAX_POINTER_SENSITIVITY) as i64
        }
    };
    let dx = scaled(x);
    let dy = -scaled(y);

    let n = dx.abs().max(dy.abs());
    out.reserve(n as usize);
    for i in 1..=n {
        // Consecutive partial sums differ by at most one, so the casts are exact.
        out.push(InjectionCommand::PointerMoveBy {
            dx: (dx * i / n - dx * (i - 1) / n) as i32,
            dy: (dy * i / n - dy * (i - 1) / n) as i32,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
