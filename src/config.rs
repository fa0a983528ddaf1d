//! Configuration for the surveillance agent.
//!
//! Settings are read from a JSON file in the user's config directory. Mail
//! credentials may instead come from the environment (`EMAIL_SENDER`,
//! `EMAIL_PASSWORD`, `EMAIL_RECEIVER`, `SMTP_SERVER`, `SMTP_PORT`), and
//! command-line flags override both. Everything is checked by
//! [`Config::validate`] before the pipeline starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class name to watch for
    pub target_object: String,

    /// Run detection on every n-th frame
    pub frame_skip: u64,

    /// How long each recording runs
    #[serde(with = "duration_serde")]
    pub record_duration: Duration,

    /// Nominal frame rate of recordings
    pub recording_fps: f64,

    /// Where recordings are written
    pub recording_dir: PathBuf,

    /// Path for storing statistics and the latest annotated frame
    pub data_path: PathBuf,

    /// Inference endpoint of the detection service
    pub detector_url: Option<String>,

    /// Per-request timeout for the detection service (in seconds)
    pub detector_timeout_secs: u64,

    /// Size frames are resized to before inference, `[width, height]`
    pub inference_size: (u32, u32),

    /// Mail settings for alerts; alerts are only logged when absent
    pub notification: Option<NotificationConfig>,

    /// How long to wait for in-flight alerts on shutdown (in seconds)
    pub notify_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("surveil-agent");

        Self {
            target_object: "person".to_string(),
            frame_skip: 5,
            record_duration: Duration::from_secs(120),
            recording_fps: 30.0,
            recording_dir: data_dir.join("recordings"),
            data_path: data_dir,
            detector_url: None,
            detector_timeout_secs: 10,
            inference_size: (640, 480),
            notification: None,
            notify_grace_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from JSON. Missing fields take their defaults.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("surveil-agent")
            .join("config.json")
    }

    /// Path of the persisted session statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Path of the latest annotated frame.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_path.join("latest_detection.png")
    }

    /// Fill mail settings from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Fill mail settings from `lookup`. Only variables that are set replace
    /// existing values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = [
            "EMAIL_SENDER",
            "EMAIL_PASSWORD",
            "EMAIL_RECEIVER",
            "SMTP_SERVER",
            "SMTP_PORT",
        ];
        if vars.iter().all(|v| lookup(v).is_none()) {
            return Ok(());
        }

        let mut notification = self.notification.take().unwrap_or_default();
        if let Some(v) = lookup("EMAIL_SENDER") {
            notification.sender_address = v;
        }
        if let Some(v) = lookup("EMAIL_PASSWORD") {
            notification.sender_secret = v;
        }
        if let Some(v) = lookup("EMAIL_RECEIVER") {
            notification.receiver_address = v;
        }
        if let Some(v) = lookup("SMTP_SERVER") {
            notification.smtp_host = v;
        }
        if let Some(v) = lookup("SMTP_PORT") {
            notification.smtp_port = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SMTP_PORT is not a valid port: '{v}'")))?;
        }
        self.notification = Some(notification);
        Ok(())
    }

    /// Check every setting the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_object.trim().is_empty() {
            return Err(ConfigError::Invalid("target_object must not be empty".into()));
        }
        if self.target_object.contains(&['/', '\\'][..]) || self.target_object.contains("..") {
            return Err(ConfigError::Invalid(
                "target_object must be a class name, not a path".into(),
            ));
        }
        if self.frame_skip == 0 {
            return Err(ConfigError::Invalid(
                "frame_skip must be a positive integer".into(),
            ));
        }
        if self.record_duration.as_secs() == 0 {
            return Err(ConfigError::Invalid(
                "record_duration must be at least one second".into(),
            ));
        }
        if !(self.recording_fps.is_finite() && self.recording_fps > 0.0) {
            return Err(ConfigError::Invalid("recording_fps must be positive".into()));
        }
        if self.inference_size.0 == 0 || self.inference_size.1 == 0 {
            return Err(ConfigError::Invalid(
                "inference_size must be non-zero".into(),
            ));
        }
        if let Some(ref notification) = self.notification {
            notification.validate()?;
        }
        Ok(())
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.recording_dir)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Mail server and identities used for alerts.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub sender_address: String,
    pub sender_secret: String,
    pub receiver_address: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("sender_address", &self.sender_address),
            ("sender_secret", &self.sender_secret),
            ("receiver_address", &self.receiver_address),
            ("smtp_host", &self.smtp_host),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "notification.{name} is not set or is empty"
                )));
            }
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::Invalid(
                "notification.smtp_port must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("sender_address", &self.sender_address)
            .field("sender_secret", &"<redacted>")
            .field("receiver_address", &self.receiver_address)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn credentials() -> NotificationConfig {
        NotificationConfig {
            sender_address: "cam@example.com".into(),
            sender_secret: "hunter2".into(),
            receiver_address: "owner@example.com".into(),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.target_object, "person");
        assert_eq!(config.frame_skip, 5);
        assert_eq!(config.record_duration, Duration::from_secs(120));
        assert!(config.notification.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir()
            .join(format!("surveil-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.target_object = "cat".into();
        config.frame_skip = 3;
        config.save_to(&path).unwrap();

        let reloaded = Config::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.target_object, "cat");
        assert_eq!(reloaded.frame_skip, 3);
        assert_eq!(reloaded.record_duration, config.record_duration);

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{"target_object": "cat", "record_duration": 30}"#).unwrap();
        assert_eq!(config.target_object, "cat");
        assert_eq!(config.record_duration, Duration::from_secs(30));
        assert_eq!(config.frame_skip, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.frame_skip = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.target_object = "  ".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.record_duration = Duration::ZERO;
        assert!(config.validate().is_err());

        for target in ["../../etc/x", "a\\b", ".."] {
            let mut config = Config::default();
            config.target_object = target.into();
            assert!(config.validate().is_err(), "accepted {target:?}");
        }

        let mut config = Config::default();
        config.target_object = "traffic light".into();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.notification = Some(NotificationConfig {
            smtp_port: 0,
            ..credentials()
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notification = Some(NotificationConfig {
            sender_secret: String::new(),
            ..credentials()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_fill_notification() {
        let env: HashMap<&str, &str> = [
            ("EMAIL_SENDER", "cam@example.com"),
            ("EMAIL_PASSWORD", "hunter2"),
            ("EMAIL_RECEIVER", "owner@example.com"),
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "587"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        let notification = config.notification.as_ref().unwrap();
        assert_eq!(notification.smtp_port, 587);
        assert_eq!(notification.smtp_host, "smtp.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_bad_port_rejected() {
        let mut config = Config::default();
        let result = config.apply_env_from(|k| (k == "SMTP_PORT").then(|| "abc".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_no_env_leaves_notification_unset() {
        let mut config = Config::default();
        config.apply_env_from(|_| None).unwrap();
        assert!(config.notification.is_none());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("hunter2"));
    }
}
