use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::engine::chat_engine::ChatSettings;

/// Top-level server configuration, loaded from parlor.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub chat: ChatSection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub address: String,
    /// Directory the frontend is served from.
    pub static_dir: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".into(),
            static_dir: "static".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ChatSection {
    /// History messages replayed on join when the client asks for no limit.
    pub history_default: usize,
    /// Server-enforced cap on any history fetch.
    pub history_max: usize,
    /// Total messages retained in memory across all rooms.
    pub message_cap: usize,
    /// Seconds of inactivity before a typing indicator auto-reverts.
    pub typing_debounce_secs: u64,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            history_default: 50,
            history_max: 200,
            message_cap: 1000,
            typing_debounce_secs: 3,
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> Self {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("failed to read config file {}: {}", path, e));
            toml::from_str(&contents)
                .unwrap_or_else(|e| panic!("failed to parse config file {}: {}", path, e))
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BIND_ADDRESS") {
            self.server.address = v;
        }
        if let Ok(v) = std::env::var("STATIC_DIR") {
            self.server.static_dir = v;
        }
        if let Ok(v) = std::env::var("HISTORY_DEFAULT")
            && let Ok(n) = v.parse()
        {
            self.chat.history_default = n;
        }
        if let Ok(v) = std::env::var("HISTORY_MAX")
            && let Ok(n) = v.parse()
        {
            self.chat.history_max = n;
        }
        if let Ok(v) = std::env::var("MESSAGE_CAP")
            && let Ok(n) = v.parse()
        {
            self.chat.message_cap = n;
        }
        if let Ok(v) = std::env::var("TYPING_DEBOUNCE_SECS")
            && let Ok(n) = v.parse()
        {
            self.chat.typing_debounce_secs = n;
        }
    }

    /// Convert the chat section into engine settings.
    pub fn to_chat_settings(&self) -> ChatSettings {
        ChatSettings {
            history_default: self.chat.history_default,
            history_max: self.chat.history_max,
            message_cap: self.chat.message_cap,
            typing_debounce: Duration::from_secs(self.chat.typing_debounce_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.chat.history_default, 50);
        assert_eq!(config.chat.history_max, 200);

        let settings = config.to_chat_settings();
        assert_eq!(settings.typing_debounce, Duration::from_secs(3));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [chat]
            history_default = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.history_default, 25);
        assert_eq!(config.chat.history_max, 200);
        assert_eq!(config.server.address, "0.0.0.0:8080");
    }
}
