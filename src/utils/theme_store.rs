//! Per-guild embed theming, kept in memory and mirrored to a JSON file.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_COLOR: u32 = 0x00ff00;
/// Discord rejects embed footers longer than this.
pub const MAX_FOOTER_LEN: usize = 2048;

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Invalid color '{0}', expected a hex value like #1db954")]
    InvalidColor(String),

    #[error("Footer is {0} characters long, the limit is {max}", max = MAX_FOOTER_LEN)]
    FooterTooLong(usize),

    #[error("Failed to access theme file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Theme file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Theme store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub color: u32,
    #[serde(default)]
    pub footer: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            footer: None,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Theme {
    pub fn color_hex(&self) -> String {
        format!("#{:06x}", self.color)
    }
}

/// Parses `#rrggbb`, `rrggbb` or `0xrrggbb`.
pub fn parse_color(input: &str) -> Result<u32, ThemeError> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ThemeError::InvalidColor(input.to_string()));
    }
    u32::from_str_radix(hex, 16).map_err(|_| ThemeError::InvalidColor(input.to_string()))
}

pub struct ThemeStore {
    path: PathBuf,
    themes: DashMap<u64, Theme>,
    save_lock: Mutex<()>,
}

impl ThemeStore {
    /// Opens the store at `path`. A missing or empty file is an empty store;
    /// an unreadable one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let themes = match load_from_disk(&path) {
            Ok(themes) => themes,
            Err(e) => {
                warn!("Failed to load themes from {:?}: {}. Starting with no themes.", path, e);
                DashMap::new()
            }
        };

        Self {
            path,
            themes,
            save_lock: Mutex::new(()),
        }
    }

    /// The guild's theme, or the default one.
    pub fn get(&self, guild_id: GuildId) -> Theme {
        self.themes
            .get(&guild_id.get())
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn set_color(&self, guild_id: GuildId, input: &str) -> Result<Theme, ThemeError> {
        let color = parse_color(input)?;
        self.update(guild_id, |theme| theme.color = color)
    }

    /// Sets or, with `None` or blank text, clears the footer.
    pub fn set_footer(&self, guild_id: GuildId, footer: Option<&str>) -> Result<Theme, ThemeError> {
        let footer = footer.map(str::trim).filter(|f| !f.is_empty());
        if let Some(text) = footer {
            let len = text.chars().count();
            if len > MAX_FOOTER_LEN {
                return Err(ThemeError::FooterTooLong(len));
            }
        }
        let footer = footer.map(str::to_string);
        self.update(guild_id, |theme| theme.footer = footer)
    }

    /// Drops the guild's theme. Returns whether one was stored.
    pub fn reset(&self, guild_id: GuildId) -> Result<bool, ThemeError> {
        let removed = self.themes.remove(&guild_id.get()).is_some();
        if removed {
            self.save()?;
            info!("Reset theme for guild {}", guild_id);
        }
        Ok(removed)
    }

    fn update<F>(&self, guild_id: GuildId, apply: F) -> Result<Theme, ThemeError>
    where
        F: FnOnce(&mut Theme),
    {
        let theme = {
            let mut entry = self.themes.entry(guild_id.get()).or_default();
            apply(entry.value_mut());
            entry.updated_at = Utc::now();
            entry.value().clone()
        };

        self.save()?;
        debug!("Updated theme for guild {}: {:?}", guild_id, theme);
        Ok(theme)
    }

    fn save(&self) -> Result<(), ThemeError> {
        let _lock = self.save_lock.lock().map_err(|_| ThemeError::Poisoned)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let snapshot: HashMap<u64, Theme> = self
            .themes
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        // Written beside the target, then renamed over it.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_from_disk(path: &Path) -> Result<DashMap<u64, Theme>, ThemeError> {
    if !path.exists() {
        info!("Theme file {:?} not found, starting empty", path);
        return Ok(DashMap::new());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(DashMap::new());
    }

    let themes: HashMap<u64, Theme> = serde_json::from_str(&content)?;
    info!("Loaded {} guild themes from {:?}", themes.len(), path);
    Ok(themes.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn store() -> (TempDir, ThemeStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::open(dir.path().join("themes.json"));
        (dir, store)
    }

    #[rstest]
    #[case("#1db954", 0x1db954)]
    #[case("1DB954", 0x1db954)]
    #[case("0xff0000", 0xff0000)]
    #[case("  #000000 ", 0)]
    fn parses_colors(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(parse_color(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("#fff")]
    #[case("#gggggg")]
    #[case("#1db9540")]
    #[case("+1db954")]
    fn rejects_bad_colors(#[case] input: &str) {
        assert_matches!(parse_color(input), Err(ThemeError::InvalidColor(_)));
    }

    #[test]
    fn unknown_guild_gets_default_theme() {
        let (_dir, store) = store();
        let theme = store.get(GuildId::new(1));
        assert_eq!(theme.color, DEFAULT_COLOR);
        assert_eq!(theme.footer, None);
        assert_eq!(theme.color_hex(), "#00ff00");
    }

    #[test]
    fn changes_survive_reopening() {
        let (dir, store) = store();
        let guild = GuildId::new(42);

        store.set_color(guild, "#123abc").unwrap();
        store.set_footer(guild, Some("Powered by cloudy")).unwrap();

        let reopened = ThemeStore::open(dir.path().join("themes.json"));
        let theme = reopened.get(guild);
        assert_eq!(theme.color, 0x123abc);
        assert_eq!(theme.footer.as_deref(), Some("Powered by cloudy"));
        assert!(theme.updated_at > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn blank_footer_clears_it() {
        let (_dir, store) = store();
        let guild = GuildId::new(7);
        store.set_footer(guild, Some("hello")).unwrap();

        let theme = store.set_footer(guild, Some("   ")).unwrap();
        assert_eq!(theme.footer, None);
    }

    #[test]
    fn overly_long_footer_is_rejected() {
        let (_dir, store) = store();
        let footer = "x".repeat(MAX_FOOTER_LEN + 1);
        assert_matches!(
            store.set_footer(GuildId::new(7), Some(&footer)),
            Err(ThemeError::FooterTooLong(_))
        );
    }

    #[test]
    fn invalid_color_leaves_theme_untouched() {
        let (_dir, store) = store();
        let guild = GuildId::new(9);
        store.set_color(guild, "#abcdef").unwrap();
        assert!(store.set_color(guild, "purple").is_err());
        assert_eq!(store.get(guild).color, 0xabcdef);
    }

    #[test]
    fn reset_restores_default() {
        let (dir, store) = store();
        let guild = GuildId::new(5);
        store.set_color(guild, "#abcdef").unwrap();

        assert!(store.reset(guild).unwrap());
        assert!(!store.reset(guild).unwrap());
        assert_eq!(store.get(guild).color, DEFAULT_COLOR);

        let reopened = ThemeStore::open(dir.path().join("themes.json"));
        assert_eq!(reopened.get(guild).color, DEFAULT_COLOR);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("themes.json");
        fs::write(&path, "{not json").unwrap();

        let store = ThemeStore::open(&path);
        assert_eq!(store.get(GuildId::new(1)), Theme::default());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("themes.json");
        let store = ThemeStore::open(&path);

        store.set_color(GuildId::new(1), "#010203").unwrap();
        assert!(path.exists());
    }
}
