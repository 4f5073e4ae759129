// Session configuration
//
// Everything one play session needs, gathered in one place and checked before
// anything connects.

use crate::scoring::ScoringConfig;
use crate::telemetry::TransportConfig;
use crate::upload::{ApiEndpoints, UploadConfig, UploadSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub transport: TransportConfig,
    pub endpoints: ApiEndpoints,
    /// None disables uploading
    pub upload: Option<UploadConfig>,
    pub upload_settings: UploadSettings,
    pub scoring: ScoringConfig,
    pub tick_interval: Duration,
    pub record_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            endpoints: ApiEndpoints::default(),
            upload: None,
            upload_settings: UploadSettings::default(),
            scoring: ScoringConfig::default(),
            tick_interval: crate::play::DEFAULT_TICK_INTERVAL,
            record_path: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.transport {
            TransportConfig::Tcp { host, port } => {
                if host.trim().is_empty() {
                    return Err(invalid("host", "must not be empty"));
                }
                if *port == 0 {
                    return Err(invalid("port", "must not be 0"));
                }
            }
            TransportConfig::Relay { url } => {
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(invalid("relay_url", format!("not a ws:// or wss:// url: {}", url)));
                }
            }
        }

        if self.upload.is_some()
            && !(self.endpoints.base_url.starts_with("http://")
                || self.endpoints.base_url.starts_with("https://"))
        {
            return Err(invalid(
                "api_base",
                format!("not an http(s) url: {}", self.endpoints.base_url),
            ));
        }
        if !self.endpoints.end_path.contains("{id}") {
            return Err(invalid("end_path", "must contain {id}"));
        }
        if self.upload_settings.post_interval.is_zero() {
            return Err(invalid("post_interval", "must be greater than zero"));
        }
        if self.scoring.duration.is_zero() {
            return Err(invalid("duration", "must be greater than zero"));
        }
        if self.scoring.attention_threshold > 100 {
            return Err(invalid("attention_threshold", "must be within 0..=100"));
        }
        if self.scoring.good_signal_threshold > 200 {
            return Err(invalid("good_signal_threshold", "must be within 0..=200"));
        }
        if self.tick_interval.is_zero() {
            return Err(invalid("tick_interval", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Read the embedding app's JSON (`{"bearerToken","gameId","prescriptionId"}`)
pub fn load_upload_config(path: &Path) -> Result<UploadConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        SessionConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SessionConfig {
            transport: TransportConfig::Relay {
                url: "http://127.0.0.1:13855".to_string(),
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "relay_url", .. })
        ));

        let mut config = SessionConfig::default();
        config.scoring.duration = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "duration", .. })
        ));

        let mut config = SessionConfig::default();
        config.upload = Some(UploadConfig {
            auth_token: None,
            game_id: 1,
            prescription_id: 1,
        });
        config.endpoints.base_url = "127.0.0.1:8000".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "api_base", .. })
        ));
    }

    #[test]
    fn test_load_upload_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bearerToken":"t","gameId":5,"prescriptionId":6}}"#).unwrap();

        let config = load_upload_config(file.path()).unwrap();
        assert_eq!(config.bearer(), Some("t"));
        assert_eq!(config.game_id, 5);

        let missing = load_upload_config(Path::new("/nonexistent/app.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
