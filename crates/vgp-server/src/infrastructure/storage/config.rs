//! TOML-based configuration for the gamepad server.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\VGamepadPC\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/vgamepad-pc/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/VGamepadPC/config.toml`
//!
//! A `--config <path>` flag on the command line replaces the default path.
//!
//! # File layout
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 8080
//! log_level = "info"
//! stats_interval_secs = 1
//!
//! [input]
//! output_mode = "keyboard_mouse"
//! deadzone = 0.5
//! mouse_sensitivity = 10
//! active_profile = "couch"
//!
//! [profiles.couch]
//! buttons = { a = "Space", b = "none", left_shoulder = "mouse:left" }
//! left_stick = { mode = "digital", up = "KeyW", down = "KeyS", left = "KeyA", right = "KeyD" }
//! right_stick = { mode = "pointer" }
//! left_trigger = { action = "mouse:right", threshold = 0.5 }
//! ```
//!
//! # Profiles (for beginners)
//!
//! A profile is written as a set of *overrides* on top of the built-in
//! bindings (see [`MappingTable::default`]).  Controls the profile does not
//! mention keep their built-in binding; a button bound to `"none"` does
//! nothing.  The profile named `"default"` may be omitted entirely, in which
//! case the built-in bindings are used unchanged.
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a partial file (or no
//! file at all) still produces a complete configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vgp_core::{
    ButtonAction, GamepadButton, MappingError, MappingTable, OutputMode, Stick, ThumbstickMapping,
    TranslateOptions, Trigger, TriggerMapping, MAX_POINTER_SENSITIVITY,
};

/// Name of the profile that falls back to the built-in bindings.
pub const DEFAULT_PROFILE: &str = "default";

/// Binding value that leaves a button unbound.
pub const UNBOUND: &str = "none";

/// Lowest port accepted as-is; anything outside `1024..=65535` binds an ephemeral port.
pub const MIN_PORT: u16 = 1024;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but a value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<MappingError> for ConfigError {
    fn from(e: MappingError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Listener and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to listen on.  `"0.0.0.0"` listens on all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port; see [`ServerConfig::listen_port`].
    #[serde(default = "default_port")]
    pub port: u16,
    /// `tracing` log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds between connection statistics lines; `0` disables them.
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

/// How readings become input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Stick deflection below this magnitude is ignored.  Must be in `(0, 1)`.
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,
    /// Pixels per reading at full deflection for pointer-mode sticks.
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: u32,
    /// Profile whose bindings are used.
    #[serde(default = "default_active_profile")]
    pub active_profile: String,
}

/// Binding overrides for one named profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileConfig {
    /// Button name → action name, or [`UNBOUND`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buttons: BTreeMap<GamepadButton, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_stick: Option<StickConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_stick: Option<StickConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_trigger: Option<TriggerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_trigger: Option<TriggerConfig>,
}

/// A thumbstick entry: four directional actions or pointer motion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StickConfig {
    Digital {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        up: Option<ButtonAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        down: Option<ButtonAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        left: Option<ButtonAction>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<ButtonAction>,
    },
    Pointer {
        /// Overrides `input.mouse_sensitivity` for this stick.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sensitivity: Option<f32>,
    },
}

/// A trigger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    pub action: ButtonAction,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_stats_interval() -> u64 {
    1
}
fn default_deadzone() -> f32 {
    vgp_core::domain::translator::DEFAULT_DEADZONE
}
fn default_mouse_sensitivity() -> u32 {
    10
}
fn default_active_profile() -> String {
    DEFAULT_PROFILE.to_string()
}
fn default_threshold() -> f32 {
    TriggerMapping::DEFAULT_THRESHOLD
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::default(),
            deadzone: default_deadzone(),
            mouse_sensitivity: default_mouse_sensitivity(),
            active_profile: default_active_profile(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ServerConfig {
    /// The port to bind: the configured one, or `0` (OS-assigned) when it
    /// falls outside `1024..=65535`.
    pub fn listen_port(&self) -> u16 {
        if self.port >= MIN_PORT {
            self.port
        } else {
            0
        }
    }

    /// `bind_address:listen_port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.listen_port())
    }
}

impl InputConfig {
    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            mode: self.output_mode,
            deadzone: self.deadzone,
        }
    }
}

impl AppConfig {
    /// Checks every value that parsing alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let deadzone = self.input.deadzone;
        if !(deadzone > 0.0 && deadzone < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "input.deadzone {deadzone} is outside (0, 1)"
            )));
        }
        let sensitivity = self.input.mouse_sensitivity;
        if sensitivity == 0 || sensitivity as f32 > MAX_POINTER_SENSITIVITY {
            return Err(ConfigError::Invalid(format!(
                "input.mouse_sensitivity {sensitivity} is outside 1..={MAX_POINTER_SENSITIVITY}"
            )));
        }
        for (name, profile) in &self.profiles {
            profile
                .apply_to(MappingTable::default(), self.input.mouse_sensitivity)
                .map_err(|e| ConfigError::Invalid(format!("profile {name:?}: {e}")))?;
        }
        self.mapping_table().map(|_| ())
    }

    /// Builds the mapping table of the active profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the active profile does not exist
    /// or one of its bindings is invalid.
    pub fn mapping_table(&self) -> Result<MappingTable, ConfigError> {
        let name = self.input.active_profile.as_str();
        match self.profiles.get(name) {
            Some(profile) => profile.apply_to(MappingTable::default(), self.input.mouse_sensitivity),
            None if name == DEFAULT_PROFILE => Ok(MappingTable::default()),
            None => Err(ConfigError::Invalid(format!(
                "input.active_profile {name:?} names no profile"
            ))),
        }
    }
}

impl ProfileConfig {
    /// Applies this profile's overrides to `table`.
    ///
    /// `mouse_sensitivity` is used for pointer sticks that give none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown action names, thresholds
    /// outside `(0, 1]` and non-positive sensitivities.
    pub fn apply_to(
        &self,
        mut table: MappingTable,
        mouse_sensitivity: u32,
    ) -> Result<MappingTable, ConfigError> {
        for (button, action) in &self.buttons {
            let action = if action == UNBOUND {
                None
            } else {
                Some(action.parse::<ButtonAction>()?)
            };
            table.set_button(*button, action);
        }

        let sticks = [(Stick::Left, &self.left_stick), (Stick::Right, &self.right_stick)];
        for (stick, entry) in sticks {
            if let Some(entry) = entry {
                table.set_stick(stick, entry.to_mapping(mouse_sensitivity)?);
            }
        }

        let triggers = [
            (Trigger::Left, &self.left_trigger),
            (Trigger::Right, &self.right_trigger),
        ];
        for (trigger, entry) in triggers {
            if let Some(entry) = entry {
                let mapping = TriggerMapping::new(entry.action, entry.threshold)?;
                table.set_trigger(trigger, Some(mapping));
            }
        }
        Ok(table)
    }
}

impl StickConfig {
    fn to_mapping(&self, mouse_sensitivity: u32) -> Result<ThumbstickMapping, MappingError> {
        match *self {
            StickConfig::Digital { up, down, left, right } => {
                Ok(ThumbstickMapping::DigitalEmulation { up, down, left, right })
            }
            StickConfig::Pointer { sensitivity } => {
                ThumbstickMapping::pointer(sensitivity.unwrap_or(mouse_sensitivity as f32))
            }
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the default path of the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist yet.
///
/// The result is not validated; call [`AppConfig::validate`] after applying
/// any command-line overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory, including the application subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("VGamepadPC"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("vgamepad-pc"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("VGamepadPC")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
