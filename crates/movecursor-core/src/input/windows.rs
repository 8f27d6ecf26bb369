//! `WH_KEYBOARD_LL` hook on a dedicated message-loop thread.
//!
//! The hook callback must return quickly or Windows silently removes the hook,
//! so it only converts the event and pushes it into the channel.

use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    VIRTUAL_KEY, VK_DOWN, VK_ESCAPE, VK_F12, VK_LSHIFT, VK_NEXT, VK_PAUSE, VK_PRIOR, VK_RSHIFT,
    VK_SCROLL, VK_SHIFT, VK_UP,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG,
    PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, WH_KEYBOARD_LL,
    WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};
use windows::core::PCWSTR;

use super::{KeySource, ListenerEvent};
use crate::keys::{Key, KeyAction, KeyEvent};
use crate::platform::PlatformError;

/// Where the hook callback sends events. One hook per process.
static HOOK_SENDER: Mutex<Option<Sender<ListenerEvent>>> = Mutex::new(None);

#[derive(Default)]
pub struct HookKeySource {
    thread: Option<(u32, JoinHandle<()>)>,
}

impl HookKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for HookKeySource {
    fn start(&mut self, events: Sender<ListenerEvent>) -> Result<(), PlatformError> {
        if self.thread.is_some() {
            return Ok(());
        }

        set_sender(Some(events.clone()));

        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<u32, String>>(1);
        let handle = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || run_hook_thread(&ready_tx, &events))
            .map_err(|err| {
                PlatformError::MissingDependency(format!("keyboard hook thread: {err}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.thread = Some((thread_id, handle));
                Ok(())
            }
            Ok(Err(message)) => {
                set_sender(None);
                let _ = handle.join();
                Err(PlatformError::MissingDependency(format!(
                    "WH_KEYBOARD_LL hook: {message}"
                )))
            }
            Err(_) => {
                set_sender(None);
                Err(PlatformError::MissingDependency(
                    "keyboard hook thread exited during startup".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        let Some((thread_id, handle)) = self.thread.take() else {
            return;
        };

        // SAFETY: posting WM_QUIT to a thread id we own; failure means it already exited.
        if let Err(err) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            tracing::debug!("PostThreadMessageW(WM_QUIT) failed: {err}");
        }
        if handle.join().is_err() {
            tracing::error!("Keyboard hook thread panicked");
        }
        set_sender(None);
    }
}

impl Drop for HookKeySource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_sender(sender: Option<Sender<ListenerEvent>>) {
    match HOOK_SENDER.lock() {
        Ok(mut slot) => *slot = sender,
        Err(poisoned) => *poisoned.into_inner() = sender,
    }
}

fn run_hook_thread(
    ready: &mpsc::SyncSender<Result<u32, String>>,
    events: &Sender<ListenerEvent>,
) {
    // SAFETY: plain Win32 calls on the thread that owns the hook and message loop.
    unsafe {
        let module = match GetModuleHandleW(PCWSTR::null()) {
            Ok(module) => module,
            Err(err) => {
                let _ = ready.send(Err(err.to_string()));
                return;
            }
        };

        let hook = match SetWindowsHookExW(
            WH_KEYBOARD_LL,
            Some(keyboard_proc),
            HINSTANCE(module.0),
            0,
        ) {
            Ok(hook) => hook,
            Err(err) => {
                let _ = ready.send(Err(err.to_string()));
                return;
            }
        };

        let _ = ready.send(Ok(GetCurrentThreadId()));
        tracing::debug!("Keyboard hook installed");

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        if let Err(err) = UnhookWindowsHookEx(hook) {
            tracing::warn!("UnhookWindowsHookEx failed: {err}");
        }
    }

    let _ = events.send(ListenerEvent::Closed("keyboard hook removed".to_string()));
    tracing::debug!("Keyboard hook thread exited");
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        // SAFETY: for WH_KEYBOARD_LL with HC_ACTION, lparam points to a KBDLLHOOKSTRUCT.
        let info = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
        let action = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyAction::Press),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyAction::Release),
            _ => None,
        };
        if let Some(action) = action {
            forward(KeyEvent {
                key: key_from_vk(info.vkCode),
                action,
            });
        }
    }

    // SAFETY: always pass the event on; this listener only observes.
    unsafe { CallNextHookEx(HHOOK::default(), code, wparam, lparam) }
}

fn forward(event: KeyEvent) {
    if let Ok(slot) = HOOK_SENDER.lock()
        && let Some(sender) = slot.as_ref()
    {
        let _ = sender.send(ListenerEvent::Key(event));
    }
}

fn key_from_vk(vk: u32) -> Key {
    match VIRTUAL_KEY(vk as u16) {
        VK_PRIOR => Key::PageUp,
        VK_NEXT => Key::PageDown,
        VK_UP => Key::Up,
        VK_DOWN => Key::Down,
        VK_F12 => Key::F12,
        VK_SCROLL => Key::ScrollLock,
        VK_PAUSE => Key::Pause,
        VK_ESCAPE => Key::Escape,
        VK_LSHIFT | VK_SHIFT => Key::ShiftLeft,
        VK_RSHIFT => Key::ShiftRight,
        _ => Key::Other(vk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_key_mapping() {
        assert_eq!(key_from_vk(0x21), Key::PageUp);
        assert_eq!(key_from_vk(0x22), Key::PageDown);
        assert_eq!(key_from_vk(0x7B), Key::F12);
        assert_eq!(key_from_vk(0x1B), Key::Escape);
        assert_eq!(key_from_vk(0xA0), Key::ShiftLeft);
        assert_eq!(key_from_vk(0xA1), Key::ShiftRight);
        assert_eq!(key_from_vk(0x41), Key::Other(0x41));
    }

    #[test]
    fn test_stop_without_start_is_a_no_op() {
        let mut source = HookKeySource::new();
        source.stop();
        source.stop();
    }
}
