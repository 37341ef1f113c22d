use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::annotation::{Color, TextStyle};
use crate::history::DEFAULT_CAPACITY;
use crate::measure::FontFace;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Style used for new text when a command does not carry one.
    pub default_style: TextStyle,
    pub history_capacity: usize,
    pub blank_width: u32,
    pub blank_height: u32,
    pub blank_fill: Color,
    pub fonts: Vec<FontFace>,
    pub export_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_style: TextStyle::default(),
            history_capacity: DEFAULT_CAPACITY,
            blank_width: 800,
            blank_height: 600,
            blank_fill: Color::WHITE,
            fonts: Vec::new(),
            export_name: "screenshot-edited".into(),
        }
    }
}

impl Settings {
    fn file_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "snaptext", "snaptext")?;
        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir).ok()?;
        Some(config_dir.join("settings.json"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::file_path().context("cannot resolve settings path")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("cannot write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::annotation::{Color, TextSize};

    #[test]
    fn defaults_match_editor_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.history_capacity, 50);
        assert_eq!(settings.default_style.size, TextSize::from_px(80));
        assert_eq!(settings.default_style.color, Color::WHITE);
        assert_eq!(settings.default_style.background, None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.default_style.background = Some(Color::BLACK);
        settings.history_capacity = 10;
        settings.save_to(&path).expect("save");

        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"blank_width": 320}"#).expect("write");

        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded.blank_width, 320);
        assert_eq!(loaded.blank_height, 600);
        assert_eq!(loaded.export_name, "screenshot-edited");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Settings::load_from(&dir.path().join("nope.json")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read settings"));
    }
}
