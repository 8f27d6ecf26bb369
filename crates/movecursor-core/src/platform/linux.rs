//! X11 backend.
//!
//! Window queries go through `xprop`, notifications through `notify-send`.
//! X11 has no way to post a scroll to a window without synthesizing pointer
//! input over it, so scroll injection reports failure.

use std::process::Command;
use std::thread;

use super::{
    HorizontalDirection, PlatformBackend, PlatformError, RunState, ScrollAmount, TerminalCatalog,
    VerticalDirection, WindowHandle, command_available, command_output,
};

pub const TERMINAL_CLASSES: &[&str] = &[
    "gnome-terminal",
    "konsole",
    "xterm",
    "urxvt",
    "alacritty",
    "kitty",
    "terminator",
    "guake",
    "xfce4-terminal",
];

pub struct LinuxBackend {
    catalog: TerminalCatalog,
    state: RunState,
}

impl LinuxBackend {
    /// Connects to the X11 session.
    ///
    /// # Errors
    /// [`PlatformError::MissingDependency`] when `DISPLAY` is unset or `xprop`
    /// cannot be run.
    pub fn new() -> Result<Self, PlatformError> {
        match std::env::var("DISPLAY") {
            Ok(x_display) if !x_display.is_empty() => {
                tracing::info!("Using X11 display {x_display}");
            }
            _ => {
                return Err(PlatformError::MissingDependency(
                    "X11 display (DISPLAY is not set)".to_string(),
                ));
            }
        }

        if !command_available("xprop", &["-version"]) {
            return Err(PlatformError::MissingDependency(
                "xprop (install x11-utils / xorg-xprop)".to_string(),
            ));
        }

        Ok(Self {
            catalog: TerminalCatalog::new(TERMINAL_CLASSES),
            state: RunState::default(),
        })
    }
}

impl PlatformBackend for LinuxBackend {
    fn name(&self) -> &'static str {
        "LinuxBackend"
    }

    fn terminal_identities(&self) -> &TerminalCatalog {
        &self.catalog
    }

    fn active_window_identity(&self) -> Option<String> {
        let handle = self.active_window_handle();
        if handle.is_none() {
            return None;
        }
        let id = format!("{:#x}", handle.0);
        let output = command_output("xprop", &["-id", &id, "WM_CLASS"])?;
        parse_wm_class(&output)
    }

    fn active_window_handle(&self) -> WindowHandle {
        command_output("xprop", &["-root", "_NET_ACTIVE_WINDOW"])
            .and_then(|output| parse_active_window(&output))
            .unwrap_or(WindowHandle::NONE)
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
        tracing::warn!("Scroll injection is not supported on X11 (scroll {direction} for window {handle})");
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
        tracing::warn!("Scroll injection is not supported on X11 (scroll {direction} for window {handle})");
        false
    }

    fn notify(&self, title: &str, message: &str) {
        let title = title.to_string();
        let message = message.to_string();
        let spawned = thread::Builder::new()
            .name("notify-send".to_string())
            .spawn(move || {
                match Command::new("notify-send")
                    .args(["--expire-time=2000", &title, &message])
                    .status()
                {
                    Ok(status) if status.success() => {
                        tracing::debug!("Shown notification: {title}");
                    }
                    Ok(status) => tracing::error!("notify-send exited with {status}"),
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

/// Parses `_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007`.
fn parse_active_window(output: &str) -> Option<WindowHandle> {
    let raw = output.rsplit(['#', ' ']).next()?.trim();
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    let id = u64::from_str_radix(hex, 16).ok()?;
    (id != 0).then_some(WindowHandle(id))
}

/// Parses `WM_CLASS(STRING) = "instance", "Class"`, preferring the class part.
fn parse_wm_class(output: &str) -> Option<String> {
    let (_, values) = output.split_once('=')?;
    let parts: Vec<&str> = values
        .split(',')
        .map(|part| part.trim().trim_matches('"'))
        .filter(|part| !part.is_empty())
        .collect();
    parts.get(1).or_else(|| parts.first()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let catalog = TerminalCatalog::new(TERMINAL_CLASSES);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.len(), TERMINAL_CLASSES.len());
    }

    #[test]
    fn test_parse_active_window() {
        assert_eq!(
            parse_active_window("_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007"),
            Some(WindowHandle(0x3a0_0007))
        );
        assert_eq!(
            parse_active_window("_NET_ACTIVE_WINDOW(WINDOW): window id # 0x0"),
            None
        );
        assert_eq!(
            parse_active_window("_NET_ACTIVE_WINDOW:  not found."),
            None
        );
    }

    #[test]
    fn test_parse_wm_class_prefers_class() {
        assert_eq!(
            parse_wm_class("WM_CLASS(STRING) = \"gnome-terminal-server\", \"Gnome-terminal\""),
            Some("Gnome-terminal".to_string())
        );
        assert_eq!(
            parse_wm_class("WM_CLASS(STRING) = \"xterm\""),
            Some("xterm".to_string())
        );
        assert_eq!(parse_wm_class("WM_CLASS:  not found."), None);
    }

    #[test]
    fn test_wm_class_classification() {
        let catalog = TerminalCatalog::new(TERMINAL_CLASSES);
        assert!(catalog.matches("Gnome-terminal"));
        assert!(catalog.matches("org.kde.konsole-12345"));
        assert!(!catalog.matches("Firefox"));
    }
}
