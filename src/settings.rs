//! Application settings storage
//!
//! Layout defaults, editor timing and the database location, kept as a JSON
//! file in the app data directory. Settings are a plain value: load one,
//! pass it where it is needed, save it back.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::auto_layout::{AutoLayout, DEFAULT_COMPONENT_GAP};
use crate::editor::ClickPolicy;
use crate::layout::{LayoutKind, LayoutOptions};

pub const APP_DIR: &str = "studymap";
pub const SETTINGS_FILE: &str = "settings.json";
pub const DB_FILE: &str = "studymap.db";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub default_layout: LayoutKind,
    /// Click pairs closer than this (ms) are treated as a double click.
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: u64,
    #[serde(default = "default_component_gap")]
    pub component_gap: f64,
    /// Overrides the default database location when set.
    #[serde(default)]
    pub db_path: Option<String>,
}

fn default_double_click_ms() -> u64 {
    300
}

fn default_component_gap() -> f64 {
    DEFAULT_COMPONENT_GAP
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            default_layout: LayoutKind::Radial,
            double_click_ms: default_double_click_ms(),
            component_gap: default_component_gap(),
            db_path: None,
        }
    }
}

/// `<data dir>/studymap`, if the platform has a data directory.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

pub fn default_settings_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join(SETTINGS_FILE))
}

impl Settings {
    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "settings file is invalid, using defaults");
                Settings::default()
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
                Settings::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))
    }

    /// Configured database path, else `<data dir>/studymap/studymap.db`.
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        match &self.db_path {
            Some(p) if !p.is_empty() => Some(PathBuf::from(p)),
            _ => app_data_dir().map(|d| d.join(DB_FILE)),
        }
    }

    pub fn auto_layout(&self) -> AutoLayout {
        AutoLayout::from_options(&self.layout, self.component_gap)
    }

    pub fn click_policy(&self) -> ClickPolicy {
        ClickPolicy {
            double_click_ms: self.double_click_ms,
        }
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "default_layout",
            "double_click_ms",
            "component_gap",
            "db_path",
            "layout.radius",
            "layout.node_spacing",
            "layout.level_spacing",
            "layout.child_radius_ratio",
            "layout.max_depth",
            "layout.include_root",
            "layout.root_label",
            "layout.arc_radius",
            "layout.max_tags",
            "layout.items_per_tag",
            "layout.items_per_category",
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "default_layout" => self.default_layout.as_str().to_string(),
            "double_click_ms" => self.double_click_ms.to_string(),
            "component_gap" => self.component_gap.to_string(),
            "db_path" => self.db_path.clone().unwrap_or_default(),
            "layout.radius" => self.layout.radius.to_string(),
            "layout.node_spacing" => self.layout.node_spacing.to_string(),
            "layout.level_spacing" => self.layout.level_spacing.to_string(),
            "layout.child_radius_ratio" => self.layout.child_radius_ratio.to_string(),
            "layout.max_depth" => self.layout.max_depth.to_string(),
            "layout.include_root" => self.layout.include_root.to_string(),
            "layout.root_label" => self.layout.root_label.clone(),
            "layout.arc_radius" => self.layout.arc_radius.to_string(),
            "layout.max_tags" => self.layout.max_tags.to_string(),
            "layout.items_per_tag" => self.layout.items_per_tag.to_string(),
            "layout.items_per_category" => self.layout.items_per_category.to_string(),
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse::<T>()
                .map_err(|_| format!("Invalid value for {}: {}", key, value))
        }

        match key {
            "default_layout" => {
                self.default_layout =
                    LayoutKind::from_str(value).ok_or_else(|| format!("Unknown layout: {}", value))?;
            }
            "double_click_ms" => self.double_click_ms = num(key, value)?,
            "component_gap" => self.component_gap = num(key, value)?,
            "db_path" => {
                self.db_path = if value.is_empty() { None } else { Some(value.to_string()) };
            }
            "layout.radius" => self.layout.radius = num(key, value)?,
            "layout.node_spacing" => self.layout.node_spacing = num(key, value)?,
            "layout.level_spacing" => self.layout.level_spacing = num(key, value)?,
            "layout.child_radius_ratio" => self.layout.child_radius_ratio = num(key, value)?,
            "layout.max_depth" => self.layout.max_depth = num(key, value)?,
            "layout.include_root" => self.layout.include_root = num(key, value)?,
            "layout.root_label" => self.layout.root_label = value.to_string(),
            "layout.arc_radius" => self.layout.arc_radius = num(key, value)?,
            "layout.max_tags" => self.layout.max_tags = num(key, value)?,
            "layout.items_per_tag" => self.layout.items_per_tag = num(key, value)?,
            "layout.items_per_category" => self.layout.items_per_category = num(key, value)?,
            _ => return Err(format!("Unknown setting: {}", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.layout.radius, 250.0);
        assert_eq!(settings.layout.max_depth, 3);
        assert_eq!(settings.double_click_ms, 300);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"double_click_ms": 450, "layout": {"radius": 300}}"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.double_click_ms, 450);
        assert_eq!(settings.layout.radius, 300.0);
        assert_eq!(settings.layout.node_spacing, 180.0);
        assert_eq!(settings.component_gap, DEFAULT_COMPONENT_GAP);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);
        let mut settings = Settings::default();
        settings.set("default_layout", "tree").unwrap();
        settings.set("layout.max_depth", "5").unwrap();
        settings.set("db_path", "/tmp/maps.db").unwrap();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.default_layout, LayoutKind::Tree);
        assert_eq!(loaded.layout.max_depth, 5);
        assert_eq!(loaded.resolved_db_path(), Some(PathBuf::from("/tmp/maps.db")));
    }

    #[test]
    fn test_get_set_keys() {
        let mut settings = Settings::default();
        for key in Settings::keys() {
            assert!(settings.get(key).is_some(), "key {} not readable", key);
        }
        assert!(settings.set("layout.radius", "abc").is_err());
        assert!(settings.set("default_layout", "spiral").is_err());
        assert!(settings.set("nope", "1").is_err());
        settings.set("layout.include_root", "false").unwrap();
        assert_eq!(settings.get("layout.include_root").as_deref(), Some("false"));
        assert_eq!(settings.click_policy().double_click_ms, 300);
        assert_eq!(settings.auto_layout().component_gap, DEFAULT_COMPONENT_GAP);
    }
}
