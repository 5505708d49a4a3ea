use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Persisted CLI state: the remembered desk plus named favorite heights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Advertised name or address of the desk to reconnect to.
    pub desk: Option<String>,

    /// Favorite positions by name, heights in centimeters.
    #[serde(default)]
    pub favorites: BTreeMap<String, f64>,
}

impl Settings {
    /// Settings directory (~/.idasen-ctl)
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".idasen-ctl"))
    }

    /// Settings file (~/.idasen-ctl/config)
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config"))
    }

    /// Load settings from file; a missing file yields empty settings.
    pub fn load() -> Result<Self> {
        let path = Self::config_file()?;

        if !path.exists() {
            log::info!("Settings file not found, starting empty");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read settings file")?;
        serde_json::from_str(&content).context("Failed to parse settings file")
    }

    /// Save settings, creating the directory on first use.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir).context("Failed to create settings directory")?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(Self::config_file()?, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Height saved under a favorite name, if any.
    pub fn fav(&self, name: &str) -> Option<f64> {
        self.favorites.get(name).copied()
    }

    pub fn add_fav(&mut self, name: &str, height_cm: f64) {
        self.favorites.insert(name.to_string(), height_cm);
    }

    /// Remove a favorite; false if no such name existed.
    pub fn del_fav(&mut self, name: &str) -> bool {
        self.favorites.remove(name).is_some()
    }

    pub fn format_favorites(&self) -> String {
        if self.favorites.is_empty() {
            return "No favorite positions saved.".to_string();
        }

        self.favorites
            .iter()
            .map(|(name, height)| format!("\t{name}: {height:.2}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorites_round_trip() {
        let mut settings = Settings::default();
        assert_eq!(settings.fav("standing"), None);

        settings.add_fav("standing", 110.25);
        settings.add_fav("sitting", 72.0);
        assert_eq!(settings.fav("standing"), Some(110.25));

        assert!(settings.del_fav("standing"));
        assert!(!settings.del_fav("standing"));
        assert_eq!(settings.fav("standing"), None);
        assert_eq!(settings.fav("sitting"), Some(72.0));
    }

    #[test]
    fn missing_favorite_is_none_not_zero() {
        // Absent names must never resolve to a height the CLI would try
        // to move to.
        let settings = Settings::default();
        assert_eq!(settings.fav("nope"), None);
    }

    #[test]
    fn format_favorites_lists_by_name() {
        let mut settings = Settings::default();
        assert_eq!(settings.format_favorites(), "No favorite positions saved.");

        settings.add_fav("standing", 110.0);
        settings.add_fav("sitting", 72.5);
        assert_eq!(
            settings.format_favorites(),
            "\tsitting: 72.50\n\tstanding: 110.00"
        );
    }
}
