//! Win32 backend.
//!
//! Scrolls by posting `WM_VSCROLL` / `WM_HSCROLL` to the target window, so
//! keyboard focus never moves.

use std::ffi::c_void;
use std::thread;

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    GetClassNameW, GetForegroundWindow, IsWindow, MB_ICONINFORMATION, MB_OK, MB_TOPMOST,
    MessageBoxW, PostMessageW, SB_LINEDOWN, SB_LINELEFT, SB_LINERIGHT, SB_LINEUP, SB_PAGEDOWN,
    SB_PAGELEFT, SB_PAGERIGHT, SB_PAGEUP, SCROLLBAR_COMMAND, WM_HSCROLL, WM_VSCROLL,
};
use windows::core::PCWSTR;

use super::{
    HorizontalDirection, PlatformBackend, RunState, ScrollAmount, TerminalCatalog,
    VerticalDirection, WindowHandle,
};

/// Longest window class name Win32 allows.
const MAX_CLASS_NAME: usize = 256;

pub struct WindowsBackend {
    catalog: TerminalCatalog,
    state: RunState,
}

impl WindowsBackend {
    pub fn new<S: AsRef<str>>(terminal_classes: &[S]) -> Self {
        Self {
            catalog: TerminalCatalog::new(terminal_classes),
            state: RunState::default(),
        }
    }

    fn post_scroll(&self, handle: WindowHandle, message: u32, command: SCROLLBAR_COMMAND) -> bool {
        if handle.is_none() {
            return false;
        }
        let hwnd = to_hwnd(handle);

        // SAFETY: IsWindow accepts any value and only reports whether it names a window.
        if !unsafe { IsWindow(hwnd) }.as_bool() {
            tracing::debug!("Window {handle} no longer exists");
            return false;
        }

        // SAFETY: PostMessageW queues the message and returns; the window may
        // vanish in between, which the call reports as an error.
        match unsafe { PostMessageW(hwnd, message, WPARAM(command.0 as usize), LPARAM(0)) } {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("PostMessageW to window {handle} failed: {err}");
                false
            }
        }
    }
}

impl PlatformBackend for WindowsBackend {
    fn name(&self) -> &'static str {
        "WindowsBackend"
    }

    fn terminal_identities(&self) -> &TerminalCatalog {
        &self.catalog
    }

    fn active_window_identity(&self) -> Option<String> {
        // SAFETY: no preconditions; returns a null HWND when nothing has focus.
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            return None;
        }

        let mut buffer = [0u16; MAX_CLASS_NAME];
        // SAFETY: the buffer outlives the call and its length is passed with the slice.
        let len = unsafe { GetClassNameW(hwnd, &mut buffer) };
        if len <= 0 {
            tracing::debug!("GetClassNameW failed for window {}", from_hwnd(hwnd));
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..len as usize]))
    }

    fn active_window_handle(&self) -> WindowHandle {
        // SAFETY: see active_window_identity.
        from_hwnd(unsafe { GetForegroundWindow() })
    }

    fn scroll_vertical(
        &self,
        handle: WindowHandle,
        direction: VerticalDirection,
        amount: ScrollAmount,
    ) -> bool {
        let command = match (direction, amount) {
            (VerticalDirection::Up, ScrollAmount::Page) => SB_PAGEUP,
            (VerticalDirection::Down, ScrollAmount::Page) => SB_PAGEDOWN,
            (VerticalDirection::Up, ScrollAmount::Line) => SB_LINEUP,
            (VerticalDirection::Down, ScrollAmount::Line) => SB_LINEDOWN,
        };
        let posted = self.post_scroll(handle, WM_VSCROLL, command);
        if posted {
            tracing::debug!("Vertical scroll {direction} posted to window {handle}");
        }
        posted
    }

    fn scroll_horizontal(
        &self,
        handle: WindowHandle,
        direction: HorizontalDirection,
        amount: ScrollAmount,
    ) -> bool {
        let command = match (direction, amount) {
            (HorizontalDirection::Left, ScrollAmount::Line) => SB_LINELEFT,
            (HorizontalDirection::Right, ScrollAmount::Line) => SB_LINERIGHT,
            (HorizontalDirection::Left, ScrollAmount::Page) => SB_PAGELEFT,
            (HorizontalDirection::Right, ScrollAmount::Page) => SB_PAGERIGHT,
        };
        let posted = self.post_scroll(handle, WM_HSCROLL, command);
        if posted {
            tracing::debug!("Horizontal scroll {direction} posted to window {handle}");
        }
        posted
    }

    fn notify(&self, title: &str, message: &str) {
        let title_w = wide(title);
        let message_w = wide(message);
        let title = title.to_string();
        // MessageBoxW blocks until dismissed, so it gets its own thread.
        let spawned = thread::Builder::new()
            .name("notification".to_string())
            .spawn(move || {
                // SAFETY: both buffers are NUL-terminated and live until the call returns.
                unsafe {
                    MessageBoxW(
                        HWND::default(),
                        PCWSTR(message_w.as_ptr()),
                        PCWSTR(title_w.as_ptr()),
                        MB_OK | MB_ICONINFORMATION | MB_TOPMOST,
                    );
                }
                tracing::debug!("Notification dismissed: {title}");
            });
        if let Err(err) = spawned {
            tracing::error!("Failed to show notification: {err}");
        }
    }

    fn run_state(&self) -> &RunState {
        &self.state
    }
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as usize as *mut c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as usize as u64)
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}
