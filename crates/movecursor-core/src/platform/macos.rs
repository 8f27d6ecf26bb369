//! macOS backend.
//!
//! Identifies the frontmost application through System Events (`osascript`).
//! Terminals are matched by bundle identifier. Scrolling a window without
//! moving the pointer over it has no public API, so injection reports failure.

use std::process::Command;
use std::thread;

use super::{
    HorizontalDirection, PlatformBackend, PlatformError, RunState, ScrollAmount, TerminalCatalog,
    VerticalDirection, WindowHandle, command_available, command_output,
};

pub const TERMINAL_BUNDLES: &[&str] = &[
    "com.apple.Terminal",
    "com.googlecode.iterm2",
    "com.microsoft.VSCode",
    "com.jetbrains.pycharm",
    "com.jetbrains.intellij",
    "org.alacritty",
    "net.kovidgoyal.kitty",
];

const FRONTMOST_BUNDLE_SCRIPT: &str = "tell application \"System Events\" to get bundle identifier of first application process whose frontmost is true";
const FRONTMOST_PID_SCRIPT: &str =
    "tell application \"System Events\" to get unix id of first application process whose frontmost is true";

pub struct MacOsBackend {
    catalog: TerminalCatalog,
    state: RunState,
}

impl MacOsBackend {
    /// # Errors
    /// [`PlatformError::MissingDependency`] when `osascript` cannot be run.
    pub fn new() -> Result<Self, PlatformError> {
        if !command_available("osascript", &["-e", "return"]) {
            return Err(PlatformError::MissingDependency(
                "osascript (AppleScript runtime)".to_string(),
            ));
        }

        Ok(Self {
            catalog: TerminalCatalog::new(TERMINAL_BUNDLES),
            state: RunState::default(),
        })
    }
}

impl PlatformBackend for MacOsBackend {
    fn name(&self) -> &'static str {
        "MacOsBackend"
    }

    fn terminal_identities(&self) -> &TerminalCatalog {
        &self.catalog
    }

    fn active_window_identity(&self) -> Option<String> {
        command_output("osascript", &["-e", FRONTMOST_BUNDLE_SCRIPT])
            .filter(|bundle| bundle != "missing value")
    }

    fn active_window_handle(&self) -> WindowHandle {
        command_output("osascript", &["-e", FRONTMOST_PID_SCRIPT])
            .and_then(|pid| pid.parse::<u64>().ok())
            .map_or(WindowHandle::NONE, WindowHandle)
    }

    fn scroll_vertical(
        &self,
        handle: WindowHandle,
        direction: VerticalDirection,
        _amount: ScrollAmount,
    ) -> bool {
        if handle.is_none() {
            return false;
        }
        tracing::warn!("Scroll injection is not supported on macOS (scroll {direction} for pid {})", handle.0);
        false
    }

    fn scroll_horizontal(
        &self,
        handle: WindowHandle,
        direction: HorizontalDirection,
        _amount: ScrollAmount,
    ) -> bool {
        if handle.is_none() {
            return false;
        }
        tracing::warn!("Scroll injection is not supported on macOS (scroll {direction} for pid {})", handle.0);
        false
    }

    fn notify(&self, title: &str, message: &str) {
        let script = notification_script(title, message);
        let title = title.to_string();
        let spawned = thread::Builder::new()
            .name("osascript-notify".to_string())
            .spawn(move || {
                match Command::new("osascript").args(["-e", &script]).status() {
                    Ok(status) if status.success() => {
                        tracing::debug!("Shown notification: {title}");
                    }
                    Ok(status) => tracing::error!("osascript exited with {status}"),
                    Err(err) => tracing::error!("Failed to show notification: {err}"),
                }
            });
        if let Err(err) = spawned {
            tracing::error!("Failed to spawn notification thread: {err}");
        }
    }

    fn run_state(&self) -> &RunState {
        &self.state
    }
}

fn notification_script(title: &str, message: &str) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        escape_applescript(message),
        escape_applescript(title)
    )
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
