use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the jobs snapshot JSON produced by the scheduler side.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// How often to re-read the snapshot, in seconds.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Whether the Status column is shown at startup.
    #[serde(default = "default_show_status")]
    pub show_status: bool,

    /// Additional columns to display, in order. Names must match the
    /// built-in column registry ("Owner", "Priority", "Submitted").
    #[serde(default = "default_additional_columns")]
    pub additional_columns: Vec<String>,

    /// Thousands separator for displayed counts. Empty disables grouping.
    #[serde(default = "default_number_grouping")]
    pub number_grouping: String,

    /// Desktop notification when a job newly reports Failed.
    #[serde(default)]
    pub notifications: bool,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("jobs.json")
}

fn default_refresh_secs() -> u64 {
    5
}

fn default_show_status() -> bool {
    true
}

fn default_additional_columns() -> Vec<String> {
    vec!["Owner".to_string(), "Submitted".to_string()]
}

fn default_number_grouping() -> String {
    ",".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            refresh_secs: default_refresh_secs(),
            show_status: default_show_status(),
            additional_columns: default_additional_columns(),
            number_grouping: default_number_grouping(),
            notifications: false,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("jobwatch");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            snapshot_path: PathBuf::from("/var/lib/jobs/snapshot.json"),
            refresh_secs: 30,
            show_status: false,
            additional_columns: vec!["Owner".to_string(), "Priority".to_string()],
            number_grouping: ".".to_string(),
            notifications: true,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.snapshot_path, deserialized.snapshot_path);
        assert_eq!(config.refresh_secs, deserialized.refresh_secs);
        assert_eq!(config.additional_columns, deserialized.additional_columns);
        assert_eq!(config.number_grouping, deserialized.number_grouping);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str("snapshot_path = \"x.json\"").unwrap();

        assert_eq!(config.snapshot_path, PathBuf::from("x.json"));
        assert_eq!(config.refresh_secs, 5);
        assert!(config.show_status);
        assert_eq!(
            config.additional_columns,
            vec!["Owner".to_string(), "Submitted".to_string()]
        );
        assert!(!config.notifications);
    }
}
