//! Application configuration
//!
//! This module re-exports shared types from fightlog-types and provides
//! platform-specific defaults and persistence for AppConfig.

use std::path::{Path, PathBuf};

pub use fightlog_types::{AppConfig, FightSettings, StatsDimension, ValidatorSettings};

use super::error::ConfigError;

const APP_NAME: &str = "fightlog";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_record_directory() -> String {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|p| p.join(APP_NAME).join("records"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence and editing
pub trait AppConfigExt: Sized {
    fn load() -> Self;
    fn load_with_defaults() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    /// Join relative paths onto the record directory.
    fn resolve_record_path(&self, path: &Path) -> PathBuf;
    /// Change one setting by its dotted key ("fights.fight_timeout_secs").
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
    /// `(key, value)` pairs for every editable setting.
    fn options(&self) -> Vec<(&'static str, String)>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            Self::load_with_defaults()
        })
    }

    /// Defaults with the platform record directory (used when no config file exists)
    fn load_with_defaults() -> Self {
        AppConfig::with_record_directory(default_record_directory())
    }

    fn try_load() -> Result<Self, ConfigError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        if config.record_directory.is_empty() {
            config.record_directory = default_record_directory();
        }
        Ok(config)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Locate)
    }

    fn resolve_record_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.record_directory.is_empty() {
            path.to_path_buf()
        } else {
            Path::new(&self.record_directory).join(path)
        }
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let seconds = || value.parse::<f64>().ok().filter(|v| *v >= 0.0).ok_or_else(invalid);
        let flag = || value.parse::<bool>().map_err(|_| invalid());

        match key {
            "record_directory" => self.record_directory = value.to_string(),
            "signal_capacity" => {
                self.signal_capacity = value.parse::<usize>().ok().filter(|c| *c > 0).ok_or_else(invalid)?
            }
            "fights.fight_timeout_secs" => self.fights.fight_timeout_secs = seconds()?,
            "fights.max_timeout_secs" => self.fights.max_timeout_secs = seconds()?,
            "fights.overlay_timeout_secs" => self.fights.overlay_timeout_secs = seconds()?,
            "fights.recent_spell_secs" => self.fights.recent_spell_secs = seconds()?,
            "validator.assassinate" => self.validator.assassinate = flag()?,
            "validator.bane" => self.validator.bane = flag()?,
            "validator.damage_shield" => self.validator.damage_shield = flag()?,
            "validator.finishing_blow" => self.validator.finishing_blow = flag()?,
            "validator.headshot" => self.validator.headshot = flag()?,
            "validator.slay_undead" => self.validator.slay_undead = flag()?,
            "validator.max_hit" => {
                self.validator.max_hit = value.parse::<i64>().ok().filter(|v| *v > 0).ok_or_else(invalid)?
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    fn options(&self) -> Vec<(&'static str, String)> {
        let f = &self.fights;
        let v = &self.validator;
        vec![
            ("record_directory", self.record_directory.clone()),
            ("signal_capacity", self.signal_capacity.to_string()),
            ("fights.fight_timeout_secs", f.fight_timeout_secs.to_string()),
            ("fights.max_timeout_secs", f.max_timeout_secs.to_string()),
            ("fights.overlay_timeout_secs", f.overlay_timeout_secs.to_string()),
            ("fights.recent_spell_secs", f.recent_spell_secs.to_string()),
            ("validator.assassinate", v.assassinate.to_string()),
            ("validator.bane", v.bane.to_string()),
            ("validator.damage_shield", v.damage_shield.to_string()),
            ("validator.finishing_blow", v.finishing_blow.to_string()),
            ("validator.headshot", v.headshot.to_string()),
            ("validator.slay_undead", v.slay_undead.to_string()),
            ("validator.max_hit", v.max_hit.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_record_directory() {
        let config = AppConfig::with_record_directory("/data/records".to_string());
        assert_eq!(
            config.resolve_record_path(Path::new("raid.tsv")),
            PathBuf::from("/data/records/raid.tsv")
        );
        assert_eq!(
            config.resolve_record_path(Path::new("/tmp/raid.tsv")),
            PathBuf::from("/tmp/raid.tsv")
        );
    }

    #[test]
    fn set_option_edits_nested_settings() {
        let mut config = AppConfig::default();
        config.set_option("validator.bane", "false").unwrap();
        config.set_option("fights.fight_timeout_secs", "45").unwrap();

        assert!(!config.validator.bane);
        assert_eq!(config.fights.fight_timeout_secs, 45.0);
        assert!(config.options().contains(&("validator.bane", "false".to_string())));
    }

    #[test]
    fn set_option_rejects_bad_input() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.set_option("fights.nope", "1"),
            Err(ConfigError::UnknownKey { .. })
        ));
        assert!(matches!(
            config.set_option("fights.max_timeout_secs", "-3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set_option("validator.headshot", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(config, AppConfig::default());
    }
}
