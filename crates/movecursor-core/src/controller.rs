//! The key-event state machine.
//!
//! ```text
//! Idle --start()--> Running <--pause key--> Paused
//!                      |                       |
//!                      +----ESC / stop()-------+--> Stopped
//! ```
//!
//! `start()` blocks the calling thread until `Stopped`. Other threads stop the
//! controller through a [`StopHandle`].

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::config::Config;
use crate::input::{self, KeySource, ListenerEvent};
use crate::keys::{Key, KeyAction, KeyBindings, KeyEvent};
use crate::platform::{
    self, HorizontalDirection, Platform, PlatformBackend, PlatformError, ScrollAmount,
    VerticalDirection, WindowHandle,
};

const NOTIFICATION_TITLE: &str = "Move Cursor";
const BANNER_RULE: &str = "==================================================";

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Behavior switches taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    pub bindings: KeyBindings,
    pub horizontal_scroll_enabled: bool,
    pub show_pause_notification: bool,
    pub scroll_repeat_delay: Duration,
}

impl From<&Config> for ControllerOptions {
    fn from(config: &Config) -> Self {
        Self {
            bindings: KeyBindings::from_config(config),
            horizontal_scroll_enabled: config.horizontal_scroll_enabled,
            show_pause_notification: config.show_pause_notification,
            scroll_repeat_delay: config.scroll_repeat_delay(),
        }
    }
}

/// Stops a running controller from any thread. Cloneable and idempotent.
#[derive(Debug, Clone)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    events: Sender<ListenerEvent>,
}

impl StopHandle {
    pub fn stop(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            // The loop may already be gone; nothing to wake then.
            let _ = self.events.send(ListenerEvent::Shutdown);
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

pub struct InputController {
    backend: Box<dyn PlatformBackend>,
    key_source: Box<dyn KeySource>,
    options: ControllerOptions,
    shift_pressed: bool,
    lifecycle: Lifecycle,
    stop_requested: Arc<AtomicBool>,
    events_tx: Sender<ListenerEvent>,
    events_rx: Receiver<ListenerEvent>,
}

impl InputController {
    pub fn new(
        backend: Box<dyn PlatformBackend>,
        key_source: Box<dyn KeySource>,
        options: ControllerOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            backend,
            key_source,
            options,
            shift_pressed: false,
            lifecycle: Lifecycle::Idle,
            stop_requested: Arc::new(AtomicBool::new(false)),
            events_tx,
            events_rx,
        }
    }

    /// Builds the backend and key listener for the running OS.
    ///
    /// # Errors
    /// Unsupported OS or missing native dependency.
    pub fn for_current_platform(config: &Config) -> Result<Self, PlatformError> {
        let platform = Platform::current()?;
        let backend = platform::create_backend(platform, config)?;
        let key_source = input::create_key_source(platform)?;
        Ok(Self::new(backend, key_source, ControllerOptions::from(config)))
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            requested: Arc::clone(&self.stop_requested),
            events: self.events_tx.clone(),
        }
    }

    pub fn state(&self) -> ControllerState {
        match self.lifecycle {
            Lifecycle::Idle => ControllerState::Idle,
            Lifecycle::Running if self.backend.is_paused() => ControllerState::Paused,
            Lifecycle::Running => ControllerState::Running,
            Lifecycle::Stopped => ControllerState::Stopped,
        }
    }

    pub fn backend(&self) -> &dyn PlatformBackend {
        self.backend.as_ref()
    }

    pub fn shift_pressed(&self) -> bool {
        self.shift_pressed
    }

    /// Runs until ESC, [`StopHandle::stop`], or the listener closing.
    ///
    /// # Errors
    /// Only when the keyboard listener cannot be installed; the controller
    /// never reaches `Running` in that case.
    pub fn start(&mut self) -> Result<(), PlatformError> {
        match self.lifecycle {
            Lifecycle::Running => {
                tracing::warn!("Controller is already running");
                return Ok(());
            }
            Lifecycle::Stopped => {
                tracing::warn!("Controller was already stopped");
                return Ok(());
            }
            Lifecycle::Idle => {}
        }

        self.log_banner();

        if self.stop_requested.load(Ordering::SeqCst) {
            tracing::info!("Stop requested before start");
            self.lifecycle = Lifecycle::Stopped;
            return Ok(());
        }

        self.backend.start();
        if let Err(err) = self.key_source.start(self.events_tx.clone()) {
            tracing::error!("Failed to start keyboard listener: {err}");
            self.backend.stop();
            self.lifecycle = Lifecycle::Stopped;
            return Err(err);
        }
        self.lifecycle = Lifecycle::Running;
        tracing::info!("Keyboard listener started. Press ESC to quit.");

        self.run_loop();
        self.stop();
        Ok(())
    }

    /// Stops the controller. Idempotent, including before `start()`.
    pub fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        match self.lifecycle {
            Lifecycle::Stopped => return,
            Lifecycle::Idle => {
                self.lifecycle = Lifecycle::Stopped;
                return;
            }
            Lifecycle::Running => {}
        }

        tracing::info!("Stopping controller...");
        self.lifecycle = Lifecycle::Stopped;
        self.backend.stop();
        self.key_source.stop();
        tracing::info!("Controller stopped");
    }

    fn run_loop(&mut self) {
        while self.lifecycle == Lifecycle::Running {
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            match self.events_rx.recv() {
                Ok(ListenerEvent::Key(event)) => self.dispatch(event),
                Ok(ListenerEvent::Shutdown) => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                Ok(ListenerEvent::Closed(reason)) => {
                    tracing::error!("Keyboard listener closed: {reason}");
                    break;
                }
                // We hold a sender ourselves, so this only happens on teardown.
                Err(_) => break,
            }
        }
    }

    /// Handles one key event; panics are logged and swallowed.
    pub fn dispatch(&mut self, event: KeyEvent) {
        let result = catch_unwind(AssertUnwindSafe(|| match event.action {
            KeyAction::Press => self.on_press(event.key),
            KeyAction::Release => self.on_release(event.key),
        }));

        if let Err(payload) = result {
            let handler = match event.action {
                KeyAction::Press => "on_press",
                KeyAction::Release => "on_release",
            };
            tracing::error!(
                "Error in {handler} for key {}: {}",
                event.key,
                panic_message(payload.as_ref())
            );
        }
    }

    pub fn on_press(&mut self, key: Key) {
        if key.is_shift() {
            self.shift_pressed = true;
            return;
        }

        if Some(key) == self.options.bindings.pause {
            let paused = self.backend.toggle_pause();
            self.show_pause_notification(paused);
            tracing::info!("Pause: {}", if paused { "ON" } else { "OFF" });
            return;
        }

        if key == KeyBindings::QUIT {
            tracing::info!("ESC pressed. Stopping controller.");
            self.stop();
            return;
        }

        if Some(key) == self.options.bindings.scroll_up {
            self.handle_scroll(VerticalDirection::Up);
        } else if Some(key) == self.options.bindings.scroll_down {
            self.handle_scroll(VerticalDirection::Down);
        }
    }

    pub fn on_release(&mut self, key: Key) {
        if key.is_shift() {
            self.shift_pressed = false;
        }
    }

    fn handle_scroll(&mut self, direction: VerticalDirection) {
        if self.backend.is_paused() {
            return;
        }

        let Some(identity) = self.backend.active_window_identity() else {
            tracing::debug!("Could not determine the active window class");
            return;
        };

        if !self.backend.is_terminal(&identity) {
            tracing::debug!("Window is not a terminal: {identity}");
            return;
        }

        let handle = self.backend.active_window_handle();
        if handle.is_none() {
            tracing::debug!("No handle for active window {identity}");
        }

        let (scroll, success) = self.send_scroll(handle, direction);
        if success {
            tracing::info!("{scroll} ({identity})");
        } else {
            tracing::warn!("{scroll} failed ({identity})");
        }
    }

    /// Issues the scroll for `direction`, horizontal while Shift is held.
    fn send_scroll(&self, handle: WindowHandle, direction: VerticalDirection) -> (Scroll, bool) {
        if self.shift_pressed && self.options.horizontal_scroll_enabled {
            let horizontal = direction.to_horizontal();
            let success =
                self.backend
                    .scroll_horizontal(handle, horizontal, ScrollAmount::HORIZONTAL);
            (Scroll::Horizontal(horizontal), success)
        } else {
            let success = self
                .backend
                .scroll_vertical(handle, direction, ScrollAmount::VERTICAL);
            (Scroll::Vertical(direction), success)
        }
    }

    fn show_pause_notification(&self, paused: bool) {
        if !self.options.show_pause_notification {
            return;
        }
        let message = if paused {
            "Interception paused"
        } else {
            "Interception active"
        };
        self.backend.notify(NOTIFICATION_TITLE, message);
    }

    fn log_banner(&self) {
        let bindings = &self.options.bindings;
        let describe = |key: Option<Key>| key.map_or_else(|| "none".to_string(), |k| k.to_string());

        tracing::info!("{BANNER_RULE}");
        tracing::info!("Move Cursor - scroll terminals without focusing them");
        tracing::info!("{BANNER_RULE}");
        tracing::info!("Backend: {}", self.backend.name());
        tracing::info!("Pause key: {}", describe(bindings.pause));
        tracing::info!("Scroll up: {}", describe(bindings.scroll_up));
        tracing::info!("Scroll down: {}", describe(bindings.scroll_down));
        tracing::info!(
            "Horizontal scroll: {} (Shift + key)",
            if self.options.horizontal_scroll_enabled {
                "ON"
            } else {
                "OFF"
            }
        );
        tracing::debug!(
            "Scroll repeat delay: {}ms",
            self.options.scroll_repeat_delay.as_millis()
        );
        tracing::info!("{BANNER_RULE}");
    }
}

/// The scroll actually sent to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scroll {
    Vertical(VerticalDirection),
    Horizontal(HorizontalDirection),
}

impl fmt::Display for Scroll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scroll::Vertical(direction) => write!(f, "Vertical scroll: {direction}"),
            Scroll::Horizontal(direction) => write!(f, "Horizontal scroll: {direction}"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
