//! Configuration management for Move Cursor.
//!
//! Loads configuration from ${MOVE_CURSOR_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How often the log file (when enabled) is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Single file, never rotated (default)
    #[default]
    Never,
    /// New file every hour
    Hourly,
    /// New file every day
    Daily,
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly or run `cargo xtask`.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for Move Cursor configuration and data directories.
    //!
    //! MOVE_CURSOR_HOME resolution order:
    //! 1. MOVE_CURSOR_HOME environment variable (if set)
    //! 2. ~/.config/move-cursor (default)
    //! 3. ./.move-cursor when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the Move Cursor home directory.
    pub fn home() -> PathBuf {
        if let Ok(home) = std::env::var("MOVE_CURSOR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".move-cursor"),
            |h| h.join(".config").join("move-cursor"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        home().join("config.toml")
    }

    /// Returns the directory used for relative log file paths.
    pub fn logs_dir() -> PathBuf {
        home().join("logs")
    }
}

/// Main configuration structure.
///
/// Everything the controller and backends read at startup. Nothing here is
/// mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level filter: trace, debug, info, warn, error
    pub log_level: String,

    /// Optional log file. Relative paths resolve against ${MOVE_CURSOR_HOME}/logs.
    /// Console output is always enabled.
    pub log_file: Option<PathBuf>,

    /// Rotation policy for `log_file`
    pub log_rotation: LogRotation,

    /// Maximum number of rotated log files kept (0 keeps all)
    pub log_max_files: usize,

    /// Key that toggles pause ("none" disables it)
    pub pause_key: String,

    /// Key that scrolls the focused terminal up
    pub scroll_up_key: String,

    /// Key that scrolls the focused terminal down
    pub scroll_down_key: String,

    /// Holding Shift turns up/down into left/right scrolling
    pub horizontal_scroll_enabled: bool,

    /// Show a desktop notification when pause is toggled
    pub show_pause_notification: bool,

    /// Delay between repeated scrolls while a key is held, in milliseconds
    pub scroll_repeat_delay_ms: u64,

    /// Window classes treated as terminals on Windows
    pub windows_terminal_classes: Vec<String>,
}

impl Config {
    const DEFAULT_LOG_LEVEL: &str = "info";
    const DEFAULT_LOG_MAX_FILES: usize = 5;
    const DEFAULT_PAUSE_KEY: &str = "f12";
    const DEFAULT_SCROLL_UP_KEY: &str = "page_up";
    const DEFAULT_SCROLL_DOWN_KEY: &str = "page_down";
    const DEFAULT_SCROLL_REPEAT_DELAY_MS: u64 = 50;
    const DEFAULT_WINDOWS_TERMINAL_CLASSES: &[&str] = &[
        "ConsoleWindowClass",
        "CASCADIA_HOSTING_WINDOW_CLASS",
        "mintty",
        "VirtualConsoleClass",
        "PuTTY",
        "Alacritty",
        "org.wezfurlong.wezterm",
    ];

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("Invalid config in {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Rejects values the backends cannot work with.
    ///
    /// # Errors
    /// `windows_terminal_classes` is empty or holds only blank names.
    pub fn validate(&self) -> Result<()> {
        if self
            .windows_terminal_classes
            .iter()
            .all(|class| class.trim().is_empty())
        {
            anyhow::bail!("windows_terminal_classes must name at least one window class");
        }
        Ok(())
    }

    /// Scroll repeat delay as a `Duration`.
    pub fn scroll_repeat_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_repeat_delay_ms)
    }

    /// Resolves `log_file` to an absolute-ish path, if set.
    pub fn resolved_log_file(&self) -> Option<PathBuf> {
        let path = self.log_file.as_ref()?;
        if path.as_os_str().is_empty() {
            return None;
        }
        if path.is_absolute() {
            Some(path.clone())
        } else {
            Some(paths::logs_dir().join(path))
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `cargo xtask update-default-config` to keep `default_config.toml`
    /// in sync with `Config::default()`. Comments come from the embedded
    /// template, values from the Rust defaults.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                // Keep the template's decor (comments) on the key
                if let Some(Item::Value(existing)) = target.get_mut(key) {
                    let decor = existing.decor().clone();
                    *existing = v.clone();
                    *existing.decor_mut() = decor;
                } else {
                    target[key] = Item::Value(v.clone());
                }
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
            log_rotation: LogRotation::default(),
            log_max_files: Self::DEFAULT_LOG_MAX_FILES,
            pause_key: Self::DEFAULT_PAUSE_KEY.to_string(),
            scroll_up_key: Self::DEFAULT_SCROLL_UP_KEY.to_string(),
            scroll_down_key: Self::DEFAULT_SCROLL_DOWN_KEY.to_string(),
            horizontal_scroll_enabled: true,
            show_pause_notification: false,
            scroll_repeat_delay_ms: Self::DEFAULT_SCROLL_REPEAT_DELAY_MS,
            windows_terminal_classes: Self::DEFAULT_WINDOWS_TERMINAL_CLASSES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pause_key, "f12");
        assert_eq!(config.scroll_up_key, "page_up");
        assert_eq!(config.scroll_down_key, "page_down");
        assert!(config.horizontal_scroll_enabled);
        assert!(!config.show_pause_notification);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "pause_key = \"scroll_lock\"\nhorizontal_scroll_enabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.pause_key, "scroll_lock");
        assert!(!config.horizontal_scroll_enabled);
        assert_eq!(config.scroll_down_key, "page_down");
        assert_eq!(config.log_rotation, LogRotation::Never);
    }

    #[test]
    fn test_load_invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "log_rotation = \"weekly\"\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_empty_terminal_class_list_is_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        for contents in [
            "windows_terminal_classes = []\n",
            "windows_terminal_classes = [\"\", \"  \"]\n",
        ] {
            fs::write(&config_path, contents).unwrap();
            let err = Config::load_from(&config_path).unwrap_err();
            assert!(format!("{err:#}").contains("windows_terminal_classes"));
        }

        fs::write(&config_path, "windows_terminal_classes = [\"mintty\"]\n").unwrap();
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.windows_terminal_classes, vec!["mintty".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("pause_key = \"f12\""));
        assert!(contents.contains("# log_file ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_keeps_comments_and_values() {
        let generated = Config::generate().unwrap();
        assert!(generated.contains("# Key that toggles pause"));

        let config: Config = toml::from_str(&generated).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_resolved_log_file() {
        let mut config = Config::default();
        assert_eq!(config.resolved_log_file(), None);

        config.log_file = Some(PathBuf::new());
        assert_eq!(config.resolved_log_file(), None);

        let dir = tempdir().unwrap();
        let absolute = dir.path().join("move-cursor.log");
        config.log_file = Some(absolute.clone());
        assert_eq!(config.resolved_log_file(), Some(absolute));

        config.log_file = Some(PathBuf::from("move-cursor.log"));
        let resolved = config.resolved_log_file().unwrap();
        assert!(resolved.ends_with(Path::new("logs").join("move-cursor.log")));
    }

    #[test]
    fn test_scroll_repeat_delay() {
        let config = Config {
            scroll_repeat_delay_ms: 120,
            ..Config::default()
        };
        assert_eq!(config.scroll_repeat_delay(), Duration::from_millis(120));
    }
}
