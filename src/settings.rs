use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::debouncer::DEFAULT_QUIET_PERIOD;
use crate::renderer::DEFAULT_RENDERER_COMMAND;
use crate::theme::ExportTheme;
use crate::viewport::DEFAULT_CONTROL_STRIP_HEIGHT;

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "mermaidlens";

pub const DEFAULT_PNG_RESOLUTION: u32 = 1920;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to write settings file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// `auto` follows the editor theme, anything else names a diagram theme
    #[serde(default)]
    pub export_mermaid_theme: ExportTheme,

    /// Long edge of exported PNGs, in pixels
    #[serde(default = "default_png_resolution")]
    pub export_png_resolution: u32,

    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    #[serde(default = "default_control_strip_height")]
    pub control_strip_height: f64,

    #[serde(default = "default_renderer_command")]
    pub renderer_command: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_png_resolution() -> u32 {
    DEFAULT_PNG_RESOLUTION
}

fn default_refresh_delay_ms() -> u64 {
    DEFAULT_QUIET_PERIOD.as_millis() as u64
}

fn default_control_strip_height() -> f64 {
    DEFAULT_CONTROL_STRIP_HEIGHT
}

fn default_renderer_command() -> String {
    DEFAULT_RENDERER_COMMAND.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            export_mermaid_theme: ExportTheme::Auto,
            export_png_resolution: default_png_resolution(),
            refresh_delay_ms: default_refresh_delay_ms(),
            control_strip_height: default_control_strip_height(),
            renderer_command: default_renderer_command(),
        }
    }
}

impl Settings {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    /// Replace values the viewer cannot work with
    fn normalize(&mut self) {
        if self.export_png_resolution == 0 {
            warn!("export_png_resolution must be positive, using {DEFAULT_PNG_RESOLUTION}");
            self.export_png_resolution = DEFAULT_PNG_RESOLUTION;
        }
        if !(self.control_strip_height >= 0.0) {
            warn!("control_strip_height must not be negative, using {DEFAULT_CONTROL_STRIP_HEIGHT}");
            self.control_strip_height = DEFAULT_CONTROL_STRIP_HEIGHT;
        }
        if self.renderer_command.trim().is_empty() {
            self.renderer_command = default_renderer_command();
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings, writing defaults when the file does not exist yet.
/// Unreadable or malformed files are logged and replaced by defaults in memory.
pub fn load_or_create(path: &Path) -> Settings {
    if !path.exists() {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        if let Err(e) = save_settings_to_file(&settings, path) {
            error!("{e}");
        }
        return settings;
    }

    match load_settings_from_path(path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            Settings::default()
        }
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: Settings =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        if let Err(e) = save_settings_to_file(&settings, path) {
            warn!("Migrated settings could not be saved: {e}");
        }
    }
    settings.normalize();
    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 stored the PNG resolution as a short-edge size of 1080
    if settings.version < 2 && settings.export_png_resolution == 1080 {
        settings.export_png_resolution = DEFAULT_PNG_RESOLUTION;
    }

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> Result<(), SettingsError> {
    let write_error = |source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    fs::write(path, generate_settings_yaml(settings)).map_err(write_error)?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!(
        "export_mermaid_theme: {}\n",
        yaml_string(&settings.export_mermaid_theme.to_string())
    ));
    content.push_str(&format!(
        "export_png_resolution: {}\n",
        settings.export_png_resolution
    ));
    content.push_str(&format!("refresh_delay_ms: {}\n", settings.refresh_delay_ms));
    content.push_str(&format!(
        "control_strip_height: {}\n",
        settings.control_strip_height
    ));
    content.push_str(&format!(
        "renderer_command: {}\n",
        yaml_string(&settings.renderer_command)
    ));

    content
}

/// Single-quoted YAML scalar: backslashes stay literal, `'` is doubled
fn yaml_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

const SETTINGS_HEADER: &str = r#"
# ============================================================================
# Diagram viewer
# ============================================================================
# export_mermaid_theme: "auto" follows the editor, or name a Mermaid theme
#   (default, dark, forest, neutral)
# export_png_resolution: pixels along the long edge of exported PNGs
# refresh_delay_ms: quiet time after the last edit before re-rendering
# control_strip_height: space kept free for the toolbar at the bottom
# renderer_command: program invoked as `<cmd> -i in.mmd -o out.svg -t theme`

"#;
