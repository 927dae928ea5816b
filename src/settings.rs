use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::compositor::DEFAULT_SIDE_PANEL_WIDTH;
use crate::pdf::{
    DEFAULT_CACHE_SIZE, DEFAULT_RENDER_SCALE, DEFAULT_WORKERS, HighlightStyle, SessionConfig,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "citeview";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Device pixels per PDF point
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Highlight colour as `RRGGBB`
    #[serde(default = "default_accent_color")]
    pub accent_color: String,

    #[serde(default = "default_fill_alpha")]
    pub fill_alpha: f32,

    #[serde(default = "default_border_width")]
    pub border_width: u32,

    #[serde(default = "default_side_panel_width")]
    pub side_panel_width: u16,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_render_scale() -> f32 {
    DEFAULT_RENDER_SCALE
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_accent_color() -> String {
    "FFA500".to_string()
}

fn default_fill_alpha() -> f32 {
    HighlightStyle::default().fill_alpha
}

fn default_border_width() -> u32 {
    HighlightStyle::default().border_width
}

fn default_side_panel_width() -> u16 {
    DEFAULT_SIDE_PANEL_WIDTH
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            render_scale: default_render_scale(),
            workers: default_workers(),
            cache_size: default_cache_size(),
            accent_color: default_accent_color(),
            fill_alpha: default_fill_alpha(),
            border_width: default_border_width(),
            side_panel_width: default_side_panel_width(),
        }
    }
}

impl Settings {
    /// Session tunables derived from these settings
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let accent = parse_hex_color(&self.accent_color).unwrap_or_else(|| {
            warn!(
                "Invalid accent_color {:?}, using default",
                self.accent_color
            );
            HighlightStyle::default().accent
        });
        let render_scale = if self.render_scale.is_finite() && self.render_scale > 0.0 {
            self.render_scale
        } else {
            DEFAULT_RENDER_SCALE
        };

        SessionConfig {
            render_scale,
            workers: self.workers.max(1),
            cache_size: self.cache_size,
            style: HighlightStyle {
                accent,
                fill_alpha: self.fill_alpha.clamp(0.0, 1.0),
                border_width: self.border_width,
            },
        }
    }
}

/// Parse `RRGGBB` or `#RRGGBB`
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the config directory, creating the file with
/// defaults when it does not exist yet.
pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

/// Replace the global settings with the contents of `path`
pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    match fs::write(path, generate_settings_yaml(settings)) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("\n# Device pixels per PDF point\n");
    content.push_str(&format!("render_scale: {}\n", settings.render_scale));
    content.push_str(&format!("workers: {}\n", settings.workers));
    content.push_str(&format!("cache_size: {}\n", settings.cache_size));
    content.push_str("\n# Highlight appearance (colour as RRGGBB)\n");
    content.push_str(&format!("accent_color: \"{}\"\n", settings.accent_color));
    content.push_str(&format!("fill_alpha: {}\n", settings.fill_alpha));
    content.push_str(&format!("border_width: {}\n", settings.border_width));
    content.push_str("\n# Columns reserved for the record panel\n");
    content.push_str(&format!(
        "side_panel_width: {}\n",
        settings.side_panel_width
    ));

    content
}

// Public API for accessing settings

#[must_use]
pub fn get_settings() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

#[must_use]
pub fn get_session_config() -> SessionConfig {
    get_settings().session_config()
}

#[must_use]
pub fn get_side_panel_width() -> u16 {
    SETTINGS
        .read()
        .map(|s| s.side_panel_width)
        .unwrap_or_else(|_| default_side_panel_width())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(parse_hex_color("FFA500"), Some([0xFF, 0xA5, 0x00]));
        assert_eq!(parse_hex_color("#00ff7f"), Some([0x00, 0xFF, 0x7F]));
        assert_eq!(parse_hex_color("FFA50"), None);
        assert_eq!(parse_hex_color("GGGGGG"), None);
    }

    #[test]
    fn session_config_sanitizes_values() {
        let settings = Settings {
            render_scale: -1.0,
            workers: 0,
            accent_color: "nope".into(),
            fill_alpha: 3.0,
            ..Settings::default()
        };

        let config = settings.session_config();
        assert_eq!(config.render_scale, DEFAULT_RENDER_SCALE);
        assert_eq!(config.workers, 1);
        assert_eq!(config.style.accent, HighlightStyle::default().accent);
        assert_eq!(config.style.fill_alpha, 1.0);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let settings: Settings = serde_yaml::from_str("render_scale: 2.0\n").expect("valid yaml");
        assert_eq!(settings.render_scale, 2.0);
        assert_eq!(settings.border_width, 2);
        assert_eq!(settings.side_panel_width, DEFAULT_SIDE_PANEL_WIDTH);
    }

    #[test]
    #[serial]
    fn saved_settings_load_back_into_the_global() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let settings = Settings {
            render_scale: 1.5,
            accent_color: "336699".into(),
            side_panel_width: 30,
            ..Settings::default()
        };

        save_settings_to_file(&settings, &path);
        load_settings_from_path(&path);

        assert_eq!(get_settings(), settings);
        assert_eq!(get_side_panel_width(), 30);
        assert_eq!(get_session_config().style.accent, [0x33, 0x66, 0x99]);

        save_settings_to_file(&Settings::default(), &path);
        load_settings_from_path(&path);
    }
}
