//! evdev keyboard listener.
//!
//! Reads every keyboard under `/dev/input` without grabbing it, so keys still
//! reach the focused application. The user needs read access to the devices
//! (usually membership in the `input` group).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use evdev::{Device, InputEventKind, Key as EvKey};

use super::{KeySource, ListenerEvent};
use crate::keys::{Key, KeyAction, KeyEvent};
use crate::platform::PlatformError;

#[derive(Default)]
pub struct EvdevKeySource {
    stop: Arc<AtomicBool>,
    started: bool,
}

impl EvdevKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for EvdevKeySource {
    fn start(&mut self, events: Sender<ListenerEvent>) -> Result<(), PlatformError> {
        if self.started {
            return Ok(());
        }

        let keyboards: Vec<(PathBuf, Device)> = evdev::enumerate()
            .filter(|(_, device)| is_keyboard(device))
            .collect();
        if keyboards.is_empty() {
            return Err(PlatformError::MissingDependency(
                "readable keyboard device under /dev/input (is the user in the 'input' group?)"
                    .to_string(),
            ));
        }

        self.stop = Arc::new(AtomicBool::new(false));
        let live = Arc::new(AtomicUsize::new(keyboards.len()));

        for (path, device) in keyboards {
            let name = device.name().unwrap_or("unnamed").to_string();
            tracing::debug!("Listening on {} ({name})", path.display());

            let events = events.clone();
            let stop = Arc::clone(&self.stop);
            let live = Arc::clone(&live);
            let spawned = thread::Builder::new()
                .name(format!("evdev-{}", path.display()))
                .spawn(move || {
                    read_device(device, &path, &events, &stop);
                    reader_exited(&live, &stop, &events);
                });
            if let Err(err) = spawned {
                self.stop.store(true, Ordering::SeqCst);
                return Err(PlatformError::MissingDependency(format!(
                    "evdev reader thread: {err}"
                )));
            }
        }

        self.started = true;
        Ok(())
    }

    /// Signals the reader threads and returns without joining them.
    ///
    /// Readers block in read(2), so each one exits after the next event from
    /// its device. Events read in between are dropped once the controller's
    /// receiver is gone.
    fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.stop.store(true, Ordering::SeqCst);
        self.started = false;
    }
}

fn is_keyboard(device: &Device) -> bool {
    device
        .supported_keys()
        .is_some_and(|keys| keys.contains(EvKey::KEY_ESC) && keys.contains(EvKey::KEY_PAGEDOWN))
}

fn read_device(
    mut device: Device,
    path: &Path,
    events: &Sender<ListenerEvent>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        let batch = match device.fetch_events() {
            Ok(batch) => batch,
            Err(err) => {
                tracing::error!("Reading {} failed: {err}", path.display());
                return;
            }
        };

        for event in batch {
            let InputEventKind::Key(code) = event.kind() else {
                continue;
            };
            let action = match event.value() {
                0 => KeyAction::Release,
                // 2 is autorepeat while held
                1 | 2 => KeyAction::Press,
                _ => continue,
            };
            let event = KeyEvent {
                key: key_from_evdev(code),
                action,
            };
            if events.send(ListenerEvent::Key(event)).is_err() {
                return;
            }
        }
    }
}

/// Reports the listener closed when the last reader dies on its own.
fn reader_exited(live: &AtomicUsize, stop: &AtomicBool, events: &Sender<ListenerEvent>) {
    if live.fetch_sub(1, Ordering::SeqCst) == 1 && !stop.load(Ordering::SeqCst) {
        let _ = events.send(ListenerEvent::Closed(
            "all keyboard devices closed".to_string(),
        ));
    }
}

fn key_from_evdev(code: EvKey) -> Key {
    match code {
        EvKey::KEY_PAGEUP => Key::PageUp,
        EvKey::KEY_PAGEDOWN => Key::PageDown,
        EvKey::KEY_UP => Key::Up,
        EvKey::KEY_DOWN => Key::Down,
        EvKey::KEY_F12 => Key::F12,
        EvKey::KEY_SCROLLLOCK => Key::ScrollLock,
        EvKey::KEY_PAUSE => Key::Pause,
        EvKey::KEY_ESC => Key::Escape,
        EvKey::KEY_LEFTSHIFT => Key::ShiftLeft,
        EvKey::KEY_RIGHTSHIFT => Key::ShiftRight,
        other => Key::Other(u32::from(other.code())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evdev_key_mapping() {
        assert_eq!(key_from_evdev(EvKey::KEY_PAGEUP), Key::PageUp);
        assert_eq!(key_from_evdev(EvKey::KEY_PAGEDOWN), Key::PageDown);
        assert_eq!(key_from_evdev(EvKey::KEY_ESC), Key::Escape);
        assert_eq!(key_from_evdev(EvKey::KEY_RIGHTSHIFT), Key::ShiftRight);
        assert_eq!(
            key_from_evdev(EvKey::KEY_A),
            Key::Other(u32::from(EvKey::KEY_A.code()))
        );
    }

    #[test]
    fn test_last_reader_reports_closed_unless_stopped() {
        let (tx, rx) = std::sync::mpsc::channel();
        let live = AtomicUsize::new(2);
        let stop = AtomicBool::new(false);

        reader_exited(&live, &stop, &tx);
        assert!(rx.try_recv().is_err());
        reader_exited(&live, &stop, &tx);
        assert_eq!(
            rx.try_recv(),
            Ok(ListenerEvent::Closed("all keyboard devices closed".to_string()))
        );

        let live = AtomicUsize::new(1);
        stop.store(true, Ordering::SeqCst);
        reader_exited(&live, &stop, &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_without_start_is_a_no_op() {
        let mut source = EvdevKeySource::new();
        source.stop();
        source.stop();
    }
}
