//! Session: one connection's worth of decode → translate → inject.
//!
//! A [`Session`] owns everything that must not be shared between connections:
//! the frame buffer, the translator state, and the injection backend.  The
//! network layer feeds it raw socket bytes in arrival order and never looks
//! inside.
//!
//! # States
//!
//! ```text
//!           first reading                device error
//!   Idle ───────────────────▶ Streaming ──────────────▶ Halted
//!    ▲                                                    │
//!    └───────────────── replace_backend() ────────────────┘
//! ```
//!
//! Decode errors never change the state.  In `Halted` the session has already
//! dropped its backend and ignores input until it is given a new one.
//!
//! # Teardown
//!
//! Dropping a session releases every key, mouse button, and gamepad control
//! it still holds, then drops the backend so its virtual devices disappear.
//! This runs on every exit path, including a panic unwinding through the
//! owning thread.

use tracing::{debug, error, info, trace, warn};
use vgp_core::{
    release_all, translate, FrameBuffer, GamepadReading, InjectionCommand, MappingView,
    TranslateOptions, TranslatorState,
};

use crate::application::inject::{InjectionBackend, InjectionError, VirtualGamepad};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No reading processed yet.
    Idle,
    /// At least one reading processed.
    Streaming,
    /// The backend failed fatally; input is ignored.
    Halted,
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub readings: u64,
    pub decode_errors: u64,
    pub commands: u64,
    pub injection_errors: u64,
}

/// Drives one connection's input from raw bytes to the backend.
pub struct Session {
    backend: Option<Box<dyn InjectionBackend>>,
    mapping: MappingView,
    options: TranslateOptions,
    frames: FrameBuffer,
    translator: TranslatorState,
    state: SessionState,
    stats: SessionStats,
}

impl Session {
    /// Creates an idle session that injects through `backend`.
    ///
    /// `mapping` is the snapshot the whole session translates against; later
    /// swaps in the [`MappingStore`](vgp_core::MappingStore) do not affect it.
    pub fn new(
        backend: Box<dyn InjectionBackend>,
        mapping: MappingView,
        options: TranslateOptions,
    ) -> Self {
        debug!(
            mapping_version = mapping.version(),
            mode = ?options.mode,
            deadzone = options.deadzone,
            "session created"
        );
        Self {
            backend: Some(backend),
            mapping,
            options,
            frames: FrameBuffer::new(),
            translator: TranslatorState::default(),
            state: SessionState::Idle,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn translator_state(&self) -> &TranslatorState {
        &self.translator
    }

    /// Bytes received that do not yet form a whole message.
    pub fn pending_bytes(&self) -> usize {
        self.frames.len()
    }

    /// Feeds bytes from the socket and processes every complete message.
    ///
    /// Returns the number of readings processed.  Malformed data is logged and
    /// discarded; an incomplete trailing message is kept for the next call.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> usize {
        self.frames.extend(bytes);

        let mut processed = 0;
        while let Some(result) = self.frames.next_reading() {
            match result {
                Ok(reading) => {
                    self.process_reading(&reading);
                    processed += 1;
                }
                Err(e) => {
                    self.stats.decode_errors += 1;
                    warn!("discarding malformed input: {e}");
                }
            }
        }
        processed
    }

    /// Translates one reading and injects the resulting commands in order.
    pub fn process_reading(&mut self, reading: &GamepadReading) {
        if self.state == SessionState::Halted {
            trace!("session halted; reading ignored");
            return;
        }
        trace!(?reading, "reading");

        let (commands, next) = translate(&self.translator, reading, &self.mapping, self.options);
        self.translator = next;
        self.stats.readings += 1;
        self.state = SessionState::Streaming;

        self.dispatch(&commands);
    }

    /// Installs a fresh backend, leaving `Halted` for `Idle`.
    ///
    /// The translator starts over: whatever the old device held vanished with it.
    pub fn replace_backend(&mut self, backend: Box<dyn InjectionBackend>) {
        self.release_held();
        self.backend = Some(backend);
        self.translator = TranslatorState::default();
        self.frames.clear();
        self.state = SessionState::Idle;
        info!("injection backend replaced");
    }

    /// Releases everything held, then drops the backend.
    ///
    /// Idempotent; [`Drop`] calls it too.
    pub fn shutdown(&mut self) {
        self.release_held();
        if self.backend.take().is_some() {
            info!(
                readings = self.stats.readings,
                decode_errors = self.stats.decode_errors,
                injection_errors = self.stats.injection_errors,
                "session closed"
            );
        }
    }

    fn release_held(&mut self) {
        if self.backend.is_none() {
            return;
        }
        let (commands, rest) = release_all(&self.translator, &self.mapping, self.options.mode);
        if !commands.is_empty() {
            debug!(count = commands.len(), "releasing held input");
        }
        self.dispatch(&commands);
        self.translator = rest;
    }

    fn dispatch(&mut self, commands: &[InjectionCommand]) {
        let Some(backend) = self.backend.as_deref_mut() else {
            return;
        };

        let mut touched_gamepad = false;
        let mut fatal = None;
        for command in commands {
            touched_gamepad |= command.targets_gamepad();
            self.stats.commands += 1;
            match apply(backend, command) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    self.stats.injection_errors += 1;
                    warn!(?command, "injection failed: {e}");
                }
            }
        }

        if fatal.is_none() && touched_gamepad {
            if let Err(e) = commit(backend) {
                if e.is_fatal() {
                    fatal = Some(e);
                } else {
                    self.stats.injection_errors += 1;
                    warn!("gamepad commit failed: {e}");
                }
            }
        }

        if let Some(e) = fatal {
            self.stats.injection_errors += 1;
            error!("injection backend lost, halting session: {e}");
            self.halt();
        }
    }

    fn halt(&mut self) {
        self.backend = None;
        self.translator = TranslatorState::default();
        self.frames.clear();
        self.state = SessionState::Halted;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply(
    backend: &mut dyn InjectionBackend,
    command: &InjectionCommand,
) -> Result<(), InjectionError> {
    match *command {
        InjectionCommand::KeyDown(key) => backend.key_down(key),
        InjectionCommand::KeyUp(key) => backend.key_up(key),
        InjectionCommand::PointerButtonDown(button) => backend.pointer_button_down(button),
        InjectionCommand::PointerButtonUp(button) => backend.pointer_button_up(button),
        InjectionCommand::PointerMoveBy { dx, dy } => backend.pointer_move_by(dx, dy),
        InjectionCommand::GamepadButtonDown(button) => gamepad(backend)?.set_button(button, true),
        InjectionCommand::GamepadButtonUp(button) => gamepad(backend)?.set_button(button, false),
        InjectionCommand::GamepadAxisSet { axis, value } => gamepad(backend)?.set_axis(axis, value),
    }
}

fn commit(backend: &mut dyn InjectionBackend) -> Result<(), InjectionError> {
    gamepad(backend)?.commit()
}

fn gamepad(
    backend: &mut dyn InjectionBackend,
) -> Result<&mut dyn VirtualGamepad, InjectionError> {
    backend
        .gamepad()
        .ok_or_else(|| InjectionError::Device("backend has no virtual gamepad".to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
