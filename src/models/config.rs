use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: Reminders,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminders {
    #[serde(default = "default_followup_count")]
    pub followup_count: u32,
    #[serde(default = "default_followup_interval")]
    pub followup_interval_minutes: u32,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
}

fn default_followup_count() -> u32 {
    3
}
fn default_followup_interval() -> u32 {
    10
}
fn default_snooze_minutes() -> u32 {
    10
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            followup_count: default_followup_count(),
            followup_interval_minutes: default_followup_interval(),
            snooze_minutes: default_snooze_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
}

fn default_filter() -> String {
    "info".to_string()
}
fn default_journal_capacity() -> usize {
    100
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            journal_capacity: default_journal_capacity(),
        }
    }
}

impl Config {
    /// Load config from the standard path, or return defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the standard path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let contents = toml::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::fs::{self, OpenOptions};
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true).mode(0o600);
            let mut file = options.open(&path)?;
            file.write_all(contents.as_bytes())?;

            // Files created before the mode was enforced keep their old bits.
            let mut perms = file.metadata()?.permissions();
            if perms.mode() & 0o777 != 0o600 {
                perms.set_mode(0o600);
                fs::set_permissions(&path, perms)?;
            }
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&path, contents)?;
        }

        Ok(())
    }

    /// Apply a `section.key = value` assignment from the command line.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "reminders.followup_count" => self.reminders.followup_count = value.parse()?,
            "reminders.followup_interval_minutes" => {
                let minutes: u32 = value.parse()?;
                if minutes == 0 {
                    anyhow::bail!("reminders.followup_interval_minutes must be positive");
                }
                self.reminders.followup_interval_minutes = minutes;
            }
            "reminders.snooze_minutes" => {
                let minutes: u32 = value.parse()?;
                if minutes == 0 {
                    anyhow::bail!("reminders.snooze_minutes must be positive");
                }
                self.reminders.snooze_minutes = minutes;
            }
            "log.filter" => self.log.filter = value.to_string(),
            "log.journal_capacity" => self.log.journal_capacity = value.parse()?,
            _ => anyhow::bail!("unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn data_dir() -> PathBuf {
        if let Ok(home) = std::env::var("MEDREMIND_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .map(|h| h.join(".medremind"))
            .unwrap_or_else(|| PathBuf::from(".medremind"))
    }

    pub fn path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    pub fn db_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_escalation_contract() {
        let c = Config::default();
        assert_eq!(c.reminders.followup_count, 3);
        assert_eq!(c.reminders.followup_interval_minutes, 10);
        assert_eq!(c.reminders.snooze_minutes, 10);
        assert_eq!(c.log.filter, "info");
        assert_eq!(c.log.journal_capacity, 100);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("[reminders]\nsnooze_minutes = 5\n").unwrap();
        assert_eq!(c.reminders.snooze_minutes, 5);
        assert_eq!(c.reminders.followup_count, 3);
        assert_eq!(c.log.journal_capacity, 100);
    }

    #[test]
    fn set_known_and_unknown_keys() {
        let mut c = Config::default();
        c.set("reminders.followup_count", "2").unwrap();
        c.set("log.filter", "debug").unwrap();
        assert_eq!(c.reminders.followup_count, 2);
        assert_eq!(c.log.filter, "debug");
        assert!(c.set("reminders.snooze_minutes", "0").is_err());
        assert!(c.set("theme", "dark").is_err());
        assert!(c.set("reminders.followup_count", "many").is_err());
    }
}
