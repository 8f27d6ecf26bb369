//! Platform-neutral key symbols and the config key-name table.

use std::fmt;

use crate::config::Config;

/// A key as reported by the global keyboard listener.
///
/// Only the keys the controller can act on get their own variant; everything
/// else arrives as `Other` with the platform's raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    PageUp,
    PageDown,
    Up,
    Down,
    F12,
    ScrollLock,
    Pause,
    Escape,
    ShiftLeft,
    ShiftRight,
    Other(u32),
}

impl Key {
    /// Lookup table from config key names to keys.
    const NAMES: &[(&str, Key)] = &[
        ("page_up", Key::PageUp),
        ("page_down", Key::PageDown),
        ("up", Key::Up),
        ("down", Key::Down),
        ("f12", Key::F12),
        ("scroll_lock", Key::ScrollLock),
        ("pause", Key::Pause),
        ("esc", Key::Escape),
    ];

    /// Resolves a config key name (case-insensitive).
    ///
    /// `"none"`, an empty string, and unknown names all resolve to `None`.
    pub fn from_name(name: &str) -> Option<Key> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("none") {
            return None;
        }
        Self::NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, key)| *key)
    }

    /// Config name of this key, if it has one.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(name, _)| *name)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Key::ShiftLeft | Key::ShiftRight)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.name()) {
            (_, Some(name)) => f.write_str(name),
            (Key::ShiftLeft | Key::ShiftRight, None) => f.write_str("shift"),
            (Key::Other(code), None) => write!(f, "key#{code}"),
            (key, None) => write!(f, "{key:?}"),
        }
    }
}

/// Whether a key went down or came back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// A single event from the global keyboard listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self {
            key,
            action: KeyAction::Press,
        }
    }

    pub fn release(key: Key) -> Self {
        Self {
            key,
            action: KeyAction::Release,
        }
    }
}

/// The configurable bindings, resolved once at startup.
///
/// `None` means the action is unbound and cannot be reached from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyBindings {
    pub pause: Option<Key>,
    pub scroll_up: Option<Key>,
    pub scroll_down: Option<Key>,
}

impl KeyBindings {
    /// The quit key. Not configurable.
    pub const QUIT: Key = Key::Escape;

    pub fn from_config(config: &Config) -> Self {
        Self {
            pause: resolve_binding("pause_key", &config.pause_key),
            scroll_up: resolve_binding("scroll_up_key", &config.scroll_up_key),
            scroll_down: resolve_binding("scroll_down_key", &config.scroll_down_key),
        }
    }
}

fn resolve_binding(setting: &str, name: &str) -> Option<Key> {
    let key = Key::from_name(name);
    let trimmed = name.trim();
    if key.is_none() && !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("none") {
        tracing::warn!("Unknown key name '{name}' for {setting}; leaving it unbound");
    }
    if key == Some(KeyBindings::QUIT) {
        tracing::warn!("{setting} cannot use the quit key '{name}'; leaving it unbound");
        return None;
    }
    key
}
