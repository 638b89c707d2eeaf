//! Platform-specific injection backends.
//!
//! The correct implementation is selected at compile time via `#[cfg(target_os = ...)]`.
//! [`create_backend`] is the factory the network layer calls once per
//! connection; tests swap in their own [`BackendFactory`] built on
//! [`mock::MockInjectionBackend`].

use std::sync::Arc;

use vgp_core::OutputMode;

use crate::application::inject::{InjectionBackend, InjectionError};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "linux")]
pub mod linux;

/// Builds a fresh backend for one session.
pub type BackendFactory =
    Arc<dyn Fn(OutputMode) -> Result<Box<dyn InjectionBackend>, InjectionError> + Send + Sync>;

/// Creates the native backend for this platform.
///
/// # Errors
///
/// Returns [`InjectionError::Device`] if the virtual devices cannot be
/// created, or on a platform without a backend.
pub fn create_backend(mode: OutputMode) -> Result<Box<dyn InjectionBackend>, InjectionError> {
    #[cfg(target_os = "linux")]
    return Ok(Box::new(linux::UinputBackend::new(mode)?));
    #[cfg(target_os = "windows")]
    return Ok(Box::new(windows::WindowsBackend::new(mode)?));
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    return Err(InjectionError::Device(format!(
        "no injection backend for this platform ({mode:?})"
    )));
}

/// The factory that creates native backends.
pub fn native_factory() -> BackendFactory {
    Arc::new(create_backend)
}
