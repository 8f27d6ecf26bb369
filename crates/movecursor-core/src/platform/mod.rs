//! Per-OS window capabilities: focused-window lookup, terminal classification,
//! scroll injection, and notifications.
//!
//! Every backend implements [`PlatformBackend`]. Exactly one is created per
//! process through [`create_backend`], keyed on the runtime [`Platform`] tag.

use std::fmt;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;

mod catalog;
pub mod linux;
pub mod macos;
#[cfg(windows)]
pub mod windows;

pub use catalog::TerminalCatalog;

/// Operating systems with a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// Platform of the running process.
    ///
    /// # Errors
    /// Returns [`PlatformError::Unsupported`] on any other OS.
    pub fn current() -> Result<Self, PlatformError> {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` value to a platform tag.
    ///
    /// # Errors
    /// Returns [`PlatformError::Unsupported`] for unknown identifiers.
    pub fn from_os(os: &str) -> Result<Self, PlatformError> {
        match os {
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            other => Err(PlatformError::Unsupported(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Linux => write!(f, "linux"),
            Platform::MacOs => write!(f, "macos"),
        }
    }
}

/// Fatal startup errors from the platform layer.
///
/// Transient failures (no focused window, stale handle, failed injection) are
/// never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The OS has no backend.
    Unsupported(String),
    /// A native API, tool, or device the backend needs is not available.
    MissingDependency(String),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Unsupported(os) => write!(f, "unsupported operating system: {os}"),
            PlatformError::MissingDependency(what) => {
                write!(f, "missing native dependency: {what}")
            }
        }
    }
}

impl std::error::Error for PlatformError {}

/// Opaque handle of a native window. Zero means "no window".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    pub const NONE: WindowHandle = WindowHandle(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalDirection {
    Left,
    Right,
}

impl VerticalDirection {
    /// Horizontal counterpart used while Shift is held: up is left, down is right.
    pub fn to_horizontal(self) -> HorizontalDirection {
        match self {
            VerticalDirection::Up => HorizontalDirection::Left,
            VerticalDirection::Down => HorizontalDirection::Right,
        }
    }
}

/// Error for direction strings other than up/down/left/right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scroll direction: {}", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for VerticalDirection {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(VerticalDirection::Up),
            "down" => Ok(VerticalDirection::Down),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

impl FromStr for HorizontalDirection {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(HorizontalDirection::Left),
            "right" => Ok(HorizontalDirection::Right),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for VerticalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerticalDirection::Up => write!(f, "up"),
            VerticalDirection::Down => write!(f, "down"),
        }
    }
}

impl fmt::Display for HorizontalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HorizontalDirection::Left => write!(f, "left"),
            HorizontalDirection::Right => write!(f, "right"),
        }
    }
}

/// Granularity of one scroll command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAmount {
    Line,
    Page,
}

impl ScrollAmount {
    /// Default for vertical scrolling.
    pub const VERTICAL: ScrollAmount = ScrollAmount::Page;
    /// Default for horizontal scrolling.
    pub const HORIZONTAL: ScrollAmount = ScrollAmount::Line;
}

/// The running/paused flags every backend carries.
///
/// Atomics so `stop()` can race with the event loop without corrupting state.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    paused: AtomicBool,
}

impl RunState {
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn set_pause(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Capabilities a platform provides to the input controller.
///
/// All query and injection methods are best effort: failures come back as
/// `None`, [`WindowHandle::NONE`], or `false` and are logged by the backend.
pub trait PlatformBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Known terminal identities for this OS.
    fn terminal_identities(&self) -> &TerminalCatalog;

    /// Class name (Windows/X11) or bundle identifier (macOS) of the focused window.
    fn active_window_identity(&self) -> Option<String>;

    /// Handle of the focused window, or [`WindowHandle::NONE`].
    fn active_window_handle(&self) -> WindowHandle;

    /// Posts a vertical scroll to `handle` without changing focus.
    fn scroll_vertical(
        &self,
        handle: WindowHandle,
        direction: VerticalDirection,
        amount: ScrollAmount,
    ) -> bool;

    /// Posts a horizontal scroll to `handle` without changing focus.
    fn scroll_horizontal(
        &self,
        handle: WindowHandle,
        direction: HorizontalDirection,
        amount: ScrollAmount,
    ) -> bool;

    /// Shows a transient native notification. Never blocks the caller for long.
    fn notify(&self, title: &str, message: &str);

    fn run_state(&self) -> &RunState;

    /// Case-insensitive exact or substring match against the catalog.
    fn is_terminal(&self, identity: &str) -> bool {
        self.terminal_identities().matches(identity)
    }

    fn start(&self) {
        self.run_state().start();
    }

    fn stop(&self) {
        self.run_state().stop();
    }

    fn toggle_pause(&self) -> bool {
        self.run_state().toggle_pause()
    }

    fn set_pause(&self, paused: bool) {
        self.run_state().set_pause(paused);
    }

    fn is_running(&self) -> bool {
        self.run_state().is_running()
    }

    fn is_paused(&self) -> bool {
        self.run_state().is_paused()
    }
}

/// Creates the backend for `platform`.
///
/// # Errors
/// [`PlatformError::MissingDependency`] when the backend's native requirements
/// are not met, or when the binary was built without support for `platform`.
pub fn create_backend(
    platform: Platform,
    config: &Config,
) -> Result<Box<dyn PlatformBackend>, PlatformError> {
    match platform {
        Platform::Windows => create_windows_backend(config),
        Platform::Linux => Ok(Box::new(linux::LinuxBackend::new()?)),
        Platform::MacOs => Ok(Box::new(macos::MacOsBackend::new()?)),
    }
}

#[cfg(windows)]
fn create_windows_backend(config: &Config) -> Result<Box<dyn PlatformBackend>, PlatformError> {
    Ok(Box::new(windows::WindowsBackend::new(
        &config.windows_terminal_classes,
    )))
}

#[cfg(not(windows))]
fn create_windows_backend(_config: &Config) -> Result<Box<dyn PlatformBackend>, PlatformError> {
    Err(PlatformError::MissingDependency(
        "Win32 API (binary built for a non-Windows target)".to_string(),
    ))
}

/// Runs a command and returns its trimmed stdout, or `None` on any failure.
pub(crate) fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output();
    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!stdout.is_empty()).then_some(stdout)
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("{program} exited with {}: {}", output.status, stderr.trim());
            None
        }
        Err(err) => {
            tracing::debug!("Failed to run {program}: {err}");
            None
        }
    }
}

/// Whether `program` can be spawned at all.
pub(crate) fn command_available(program: &str, probe_args: &[&str]) -> bool {
    Command::new(program)
        .args(probe_args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("windows"), Ok(Platform::Windows));
        assert_eq!(Platform::from_os("linux"), Ok(Platform::Linux));
        assert_eq!(Platform::from_os("macos"), Ok(Platform::MacOs));
        assert_eq!(
            Platform::from_os("freebsd"),
            Err(PlatformError::Unsupported("freebsd".to_string()))
        );
    }

    #[test]
    fn test_unsupported_error_message() {
        let err = Platform::from_os("haiku").unwrap_err();
        assert_eq!(err.to_string(), "unsupported operating system: haiku");
    }

    #[test]
    fn test_toggle_pause_is_a_pure_flip() {
        let state = RunState::default();
        state.start();
        assert!(!state.is_paused());

        assert!(state.toggle_pause());
        assert!(state.is_paused());
        assert!(!state.toggle_pause());
        assert!(!state.is_paused());
    }

    #[test]
    fn test_set_pause_overrides_prior_state() {
        let state = RunState::default();
        state.set_pause(true);
        assert!(state.is_paused());
        state.set_pause(true);
        assert!(state.is_paused());
        state.set_pause(false);
        assert!(!state.is_paused());
    }

    #[test]
    fn test_start_and_stop_clear_pause() {
        let state = RunState::default();
        state.start();
        state.set_pause(true);
        state.stop();
        assert!(!state.is_running());
        assert!(!state.is_paused());

        state.set_pause(true);
        state.start();
        assert!(state.is_running());
        assert!(!state.is_paused());

        state.start();
        assert!(state.is_running());
        state.stop();
        state.stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("UP".parse(), Ok(VerticalDirection::Up));
        assert_eq!("down".parse(), Ok(VerticalDirection::Down));
        assert_eq!("Left".parse(), Ok(HorizontalDirection::Left));
        assert_eq!("right".parse(), Ok(HorizontalDirection::Right));
        assert!("sideways".parse::<VerticalDirection>().is_err());
        assert!("up".parse::<HorizontalDirection>().is_err());
    }

    #[test]
    fn test_shift_maps_vertical_to_horizontal() {
        assert_eq!(
            VerticalDirection::Up.to_horizontal(),
            HorizontalDirection::Left
        );
        assert_eq!(
            VerticalDirection::Down.to_horizontal(),
            HorizontalDirection::Right
        );
    }

    #[test]
    fn test_window_handle() {
        assert!(WindowHandle::NONE.is_none());
        assert!(WindowHandle::default().is_none());
        assert!(!WindowHandle(0x1a2b).is_none());
        assert_eq!(WindowHandle(0x1a2b).to_string(), "0x1a2b");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_windows_backend_unavailable_off_windows() {
        let result = create_backend(Platform::Windows, &Config::default());
        assert!(matches!(result, Err(PlatformError::MissingDependency(_))));
    }
}
