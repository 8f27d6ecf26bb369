//! Global keyboard listeners.
//!
//! A [`KeySource`] observes every key press system-wide (it never swallows
//! keys) and forwards them into a channel owned by the controller. OS hooks
//! and device reads run on the source's own threads; all handling happens on
//! the controller's thread.
//!
//! Tests drive the controller with a scripted source instead of OS hooks.

use std::sync::mpsc::Sender;

use crate::keys::KeyEvent;
use crate::platform::{Platform, PlatformError};

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

/// Messages the controller's event loop receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Key(KeyEvent),
    /// Sent by `StopHandle::stop` to wake the loop.
    Shutdown,
    /// The source can no longer deliver events.
    Closed(String),
}

/// Producer of global key events.
pub trait KeySource: Send {
    /// Installs the listener. Returns once events can flow into `events`.
    ///
    /// # Errors
    /// [`PlatformError::MissingDependency`] if the hook or devices are unavailable.
    fn start(&mut self, events: Sender<ListenerEvent>) -> Result<(), PlatformError>;

    /// Removes the listener. Idempotent.
    ///
    /// Sources may finish tearing down their threads after this returns (the
    /// evdev readers exit on their next device event); no further events are
    /// delivered to a controller that has stopped.
    fn stop(&mut self);
}

/// Creates the key source for `platform`.
///
/// # Errors
/// [`PlatformError::MissingDependency`] when the running binary has no
/// listener for `platform`.
pub fn create_key_source(platform: Platform) -> Result<Box<dyn KeySource>, PlatformError> {
    match platform {
        #[cfg(windows)]
        Platform::Windows => Ok(Box::new(windows::HookKeySource::new())),
        #[cfg(target_os = "linux")]
        Platform::Linux => Ok(Box::new(linux::EvdevKeySource::new())),
        other => Err(PlatformError::MissingDependency(format!(
            "global keyboard listener for {other} (not available in this build)"
        ))),
    }
}
