//! XDG Base Directory paths for attention.
//!
//! Plugin directories and the persisted plugin configuration live under the
//! XDG locations on every platform, the same way CLI tools like gh or kubectl
//! lay out their files.

use std::path::PathBuf;

/// Application directory name under the XDG roots.
const APP_DIR: &str = "attention";

/// Get the attention config directory.
///
/// Returns `$XDG_CONFIG_HOME/attention` if set, otherwise `~/.config/attention`.
///
/// # Examples
///
/// ```
/// use attention_paths::config_dir;
///
/// let plugin_dir = config_dir().join("plugins");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the attention data directory.
///
/// Returns `$XDG_DATA_HOME/attention` if set, otherwise `~/.local/share/attention`.
/// Persisted plugin state (`plugin_configs.json`) is stored here.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default directory scanned for plugin units.
pub fn plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

/// Default location of the persisted plugin configuration document.
pub fn plugin_config_file() -> PathBuf {
    data_dir().join("plugin_configs.json")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(var)
        && !base.is_empty()
    {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
