use serde::Deserialize;
use std::path::Path;

use crate::config::ConfigError;
use crate::secret::Secret;

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Telegram bot settings (`telegram.yaml`)
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: Secret,
    pub chat_id: String,
    /// Label for this host; the public IPv4 is used when unset
    #[serde(default)]
    pub vps_name: Option<String>,
    #[serde(default = "default_true")]
    pub include_owner: bool,
    #[serde(default = "default_true")]
    pub send_burner_pk: bool,
    #[serde(default)]
    pub mask_burner_pk: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl TelegramConfig {
    /// Load Telegram config from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telegram_config_defaults() {
        let yaml = r#"
bot_token: "123456:ABC-DEF"
chat_id: "-1001234567890"
"#;
        let config: TelegramConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.bot_token.expose(), "123456:ABC-DEF");
        assert_eq!(config.chat_id, "-1001234567890");
        assert!(config.vps_name.is_none());
        assert!(config.include_owner);
        assert!(config.send_burner_pk);
        assert!(!config.mask_burner_pk);
        assert_eq!(config.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_telegram_config_overrides() {
        let yaml = r#"
bot_token: "123456:ABC-DEF"
chat_id: "42"
vps_name: "guardian-fra-1"
include_owner: false
send_burner_pk: false
mask_burner_pk: true
"#;
        let config: TelegramConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.vps_name.as_deref(), Some("guardian-fra-1"));
        assert!(!config.include_owner);
        assert!(!config.send_burner_pk);
        assert!(config.mask_burner_pk);
    }

    #[test]
    fn test_missing_file() {
        let result = TelegramConfig::from_file("/nonexistent/telegram.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
