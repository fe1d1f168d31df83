//! Bridge configuration.
//!
//! Hosts usually build a [`Config`] from their own settings store; [`Config::load`] reads
//! the same structure from a TOML file. Every field has a default, so an empty file is a
//! valid configuration.
//!
//! ```toml
//! column_authority = "host"
//!
//! [large_file_disable]
//! bytes = 5000000
//!
//! [settings.modal.settings]
//! block_caret = true
//!
//! [settings.modal.modes.insert]
//! block_caret = false
//!
//! [settings.modal.bell]
//! duration = 0.1
//! settings = { highlight_line = true }
//! ```

use crate::mode::Mode;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use rustc_hash::FxHashMap;
use std::{path::Path, time::Duration};

/// Host settings applied to a document, keyed by host setting name.
pub type SettingsMap = Map<String, Value>;

/// Per-mode group applied on top of any visual mode.
pub const ALL_VISUAL: &str = "all visual";
/// Per-mode group applied on top of insert and replace.
pub const ALL_INSERT: &str = "all insert";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Modal editing for newly bound documents.
    pub enabled: bool,

    /// Which side wins when tab settings disagree.
    pub column_authority: ColumnAuthority,

    /// Mirror engine highlights (search matches and the like) as host regions.
    pub highlights: bool,

    /// Documents over these limits stay in native editing.
    pub large_file_disable: LargeFileLimits,

    /// Bindings refused past this many open documents.
    pub max_documents: usize,

    /// Keys buffered per document before new ones are rejected.
    pub key_queue_capacity: usize,

    /// Delay of the one-shot scroll retry after a document's first selection sync.
    pub first_scroll_delay_ms: u64,

    pub settings: ViewSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            column_authority: ColumnAuthority::default(),
            highlights: false,
            large_file_disable: LargeFileLimits::default(),
            max_documents: 4096,
            key_queue_capacity: 256,
            first_scroll_delay_ms: 50,
            settings: ViewSettings::default(),
        }
    }
}

impl Config {
    /// Read and deserialize a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn first_scroll_delay(&self) -> Duration {
        Duration::from_millis(self.first_scroll_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAuthority {
    /// Engine `expandtab`/`tabstop` are copied to the host.
    #[default]
    Engine,
    /// Host tab settings are pushed to the engine.
    Host,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LargeFileLimits {
    pub bytes: Option<usize>,
    pub lines: Option<usize>,
}

impl LargeFileLimits {
    pub fn exceeded_by(&self, text: &str) -> bool {
        let too_big = self
            .bytes
            .is_some_and(|max| max > 0 && text.len() > max);
        let too_long = self
            .lines
            .is_some_and(|max| max > 0 && text.split('\n').count() > max);
        too_big || too_long
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewSettings {
    /// Applied while a document is in native editing.
    pub native: SettingsMap,
    pub modal: ModalSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModalSettings {
    /// Base settings while modal editing is on.
    pub settings: SettingsMap,
    /// Overrides by mode name (`"normal"`, `"visual line"`, ...) and by group
    /// ([`ALL_VISUAL`], [`ALL_INSERT`]).
    pub modes: FxHashMap<String, SettingsMap>,
    pub bell: BellSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BellSettings {
    /// Seconds the bell settings stay applied. No bell without it.
    pub duration: Option<f64>,
    pub settings: SettingsMap,
}

impl ViewSettings {
    /// Settings for a document: the native set when `mode` is `None`, otherwise the
    /// modal base merged with the mode's own overrides and then its group's.
    pub fn resolve(&self, mode: Option<&Mode>) -> SettingsMap {
        let Some(mode) = mode else {
            return self.native.clone();
        };

        let mut combined = self.modal.settings.clone();
        let mut overlay = |name: &str| {
            if let Some(overrides) = self.modal.modes.get(name) {
                combined.extend(overrides.clone());
            }
        };
        if let Some(name) = mode.name() {
            overlay(name);
        }
        if mode.is_visual() {
            overlay(ALL_VISUAL);
        } else if mode.is_insert() {
            overlay(ALL_INSERT);
        }
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn loads_empty_config() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("tandem.toml");
        std::fs::write(&config_path, "").unwrap();

        let config = Config::load(&config_path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.column_authority, ColumnAuthority::Engine);
        assert_eq!(config.first_scroll_delay(), Duration::from_millis(50));
    }

    #[test]
    fn errors_on_invalid_toml() {
        let tmp_dir = tempdir().unwrap();
        let config_path = tmp_dir.path().join("tandem.toml");
        std::fs::write(&config_path, "invalid toml {{{{").unwrap();

        let result = Config::load(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }

    #[test]
    fn errors_on_nonexistent_file() {
        let tmp_dir = tempdir().unwrap();
        let result = Config::load(&tmp_dir.path().join("missing.toml"));
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn errors_on_unknown_fields() {
        assert!(Config::from_toml("colum_authority = \"host\"").is_err());
    }

    #[test]
    fn loads_full_config() {
        let config = Config::from_toml(
            r#"
            column_authority = "host"
            highlights = true

            [large_file_disable]
            lines = 10

            [settings.native]
            block_caret = false

            [settings.modal.settings]
            block_caret = true
            line_numbers = "relative"

            [settings.modal.modes.insert]
            block_caret = false

            [settings.modal.modes."all visual"]
            line_numbers = "absolute"

            [settings.modal.bell]
            duration = 0.25
            settings = { flash = true }
            "#,
        )
        .unwrap();

        assert_eq!(config.column_authority, ColumnAuthority::Host);
        assert!(config.highlights);
        assert_eq!(config.large_file_disable.lines, Some(10));
        assert_eq!(config.settings.modal.modes.len(), 2);
        assert_eq!(config.settings.modal.modes["insert"]["block_caret"], json!(false));
        assert_eq!(config.settings.modal.bell.duration, Some(0.25));
        assert_eq!(config.settings.modal.bell.settings["flash"], json!(true));
    }

    #[test]
    fn resolves_settings_per_mode() {
        let config = Config::from_toml(
            r#"
            [settings.native]
            block_caret = false

            [settings.modal.settings]
            block_caret = true
            gutter = "wide"

            [settings.modal.modes.insert]
            block_caret = false

            [settings.modal.modes.visual]
            gutter = "narrow"

            [settings.modal.modes."all visual"]
            gutter = "visual"
            "#,
        )
        .unwrap();
        let settings = &config.settings;

        assert_eq!(settings.resolve(None)["block_caret"], json!(false));

        let normal = settings.resolve(Some(&Mode::Normal));
        assert_eq!(normal["block_caret"], json!(true));
        assert_eq!(normal["gutter"], json!("wide"));

        let insert = settings.resolve(Some(&Mode::Insert));
        assert_eq!(insert["block_caret"], json!(false));

        // The group applies after the mode's own overrides.
        let visual = settings.resolve(Some(&Mode::Visual));
        assert_eq!(visual["gutter"], json!("visual"));
    }

    #[test]
    fn large_file_limits() {
        let limits = LargeFileLimits {
            bytes: Some(10),
            lines: Some(2),
        };
        assert!(!limits.exceeded_by("short"));
        assert!(limits.exceeded_by("a string over ten bytes"));
        assert!(limits.exceeded_by("a\nb\nc"));
        assert!(!LargeFileLimits::default().exceeded_by(&"x".repeat(1 << 20)));
    }
}
